pub mod guard;
pub mod inspect;
pub mod pool;

pub use guard::ensure_read_only;
pub use inspect::SchemaInspector;
pub use pool::{connect, seed_demo_data};
