//! Service layer: the two relay middlewares and their building blocks.

mod interceptor;
pub mod host;
pub mod lifecycle;
pub mod replay;
pub mod subordinate;

pub use host::HostRelay;
pub use lifecycle::Disposer;
pub use replay::ReplayListener;
pub use subordinate::SubordinateRelay;
