//! CLI command handlers, one per file.

mod analyze;
mod info;
mod proxy_link;
mod serve;

pub use analyze::run_analyze;
pub use info::run_info;
pub use proxy_link::run_proxy_link;
pub use serve::run_serve;

use mprobe_core::config::MprobeConfig;
use mprobe_core::target::TargetPolicy;

fn policy(cfg: &MprobeConfig) -> TargetPolicy {
    TargetPolicy {
        allow_private: cfg.allow_private_targets,
    }
}
