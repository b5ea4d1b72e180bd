mod flow;

pub use flow::{AuthFlow, AuthResult};
