pub mod crm;
pub mod diagnostics;
pub mod oauth;
