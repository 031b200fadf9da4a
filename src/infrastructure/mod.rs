// Infrastructure module - Timers, backoff and background task bookkeeping
pub mod backoff;
pub mod heartbeat;
pub mod task_manager;
pub mod timer;

pub use backoff::reconnect_delay;
pub use heartbeat::HeartbeatManager;
pub use task_manager::TaskManager;
pub use timer::TimerSlot;
