pub mod alert;
pub mod audit;
pub mod enums;
pub mod observation;
pub mod patient;
pub mod symptom;

pub use alert::*;
pub use audit::*;
pub use enums::*;
pub use observation::*;
pub use patient::*;
pub use symptom::*;
