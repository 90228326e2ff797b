pub mod codec;
pub mod completion;
pub mod dispatcher;
pub mod render;

pub use codec::{build_token, CallbackAction, CallbackToken, DecodeError, EventRef};
pub use completion::{
    extract_completion_url, CompletionError, CompletionGateway, HttpCompletionGateway,
};
pub use dispatcher::{CallbackDispatcher, DispatchOutcome};
pub use render::{render_event, ButtonKind, ButtonSpec, DisplayState, Notice, RenderedMessage};
