//! 浏览器连接
//!
//! 连接已运行的浏览器或启动无头浏览器，并在后台驱动 CDP 事件循环

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;
