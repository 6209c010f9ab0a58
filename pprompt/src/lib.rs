//! Prompt assembly: pattern + strategy + context + input into one
//! [`pprovider::ChatRequest`], independent of which vendor will run it.

mod assemble;
mod error;
mod template;
mod types;

pub mod prelude {
    pub use crate::{
        INPUT_VARIABLE, Pattern, PromptAssembly, Strategy, TemplateError, TemplateVars, assemble,
        assemble_with_vars, render,
    };
}

pub use assemble::{INPUT_VARIABLE, PromptAssembly, assemble, assemble_with_vars};
pub use error::TemplateError;
pub use template::{TemplateVars, render};
pub use types::{Pattern, Strategy};
