mod environment;
mod paths;

pub use environment::{Arch, HostPlatform, Os};
pub use paths::{AppPaths, AppPathsError};
