pub mod candidate_loader;
pub mod link_scanner;
pub mod quota_manager;

pub use candidate_loader::{load_candidates_file, parse_inline, CandidateQueue};
pub use link_scanner::{scan_html_for_channel_links, scan_page};
pub use quota_manager::{reset_session_if_expired, QuotaManager, QuotaPolicy, USAGE_STATE_KEY};
