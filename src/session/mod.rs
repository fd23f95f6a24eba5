//! 会话层
//!
//! 对上层只承诺一件事：要么给出一个可用页面，要么明确报告不可达。

pub mod controller;

pub use controller::{Liveness, SessionConfig, SessionController, SessionState};
