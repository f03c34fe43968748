pub mod link_ctx;
pub mod present_flow;

pub use link_ctx::LinkCtx;
pub use present_flow::{PresentFlow, PresentResult};
