//! Active theme.
//!
//! Pages can only be assigned templates the theme registers.

mod templates;

pub use templates::TemplateRegistry;
