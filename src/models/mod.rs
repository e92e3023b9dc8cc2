pub mod contact;
pub mod diagnostic;
pub mod signup;
