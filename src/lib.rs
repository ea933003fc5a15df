//! Client-side mirror of a remote prompt collection.
//!
//! [`PromptStore`] keeps an ordered list of prompts in sync with the
//! `/api/v1/prompts` endpoints through an injected [`Transport`]. Local
//! state only changes after the server confirms a call; writes are never
//! applied optimistically.

pub mod changes;
pub mod config;
pub mod error;
pub mod prompts;
pub mod transport;

pub use changes::{ChangeType, PromptChange};
pub use error::{Operation, StoreError};
pub use prompts::store::{PromptStore, Status};
pub use prompts::{NewPrompt, Prompt, PromptId, PromptUpdate};
pub use transport::{HttpTransport, Method, Transport, TransportError};
