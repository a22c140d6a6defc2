pub mod interceptor;
pub mod service;
pub mod storage;
pub mod token_store;
pub mod types;

pub use interceptor::{AuthInterceptor, RefreshError, SessionListener};
pub use service::AuthService;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use token_store::{TokenPair, TokenStore};
pub use types::{
    AuthSession, AuthUser, Credentials, RegisterRequest, RegisteredAccount, SessionPayload,
};
