//! Provider adapters
//!
//! [`HttpProviderFactory`] turns the `[providers]` configuration into
//! [`ProviderClient`](docfiller_application::ProviderClient)s.

mod factory;
#[cfg(feature = "http")]
pub mod openai_compat;

pub use factory::HttpProviderFactory;
#[cfg(feature = "http")]
pub use openai_compat::OpenAiCompatClient;
