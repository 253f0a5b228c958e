pub mod clock;
pub mod summary;
pub mod telemetry;
pub mod tenant;

pub use clock::*;
pub use summary::*;
pub use telemetry::*;
pub use tenant::*;
