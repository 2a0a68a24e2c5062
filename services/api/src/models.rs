//! Domain models, request schemas and response payloads

pub mod media;
pub mod user;

pub use media::{Media, MediaQuery, MediaResponse, MediaUpload, NewMedia, Page, UploadedFile};
pub use user::{
    NewUser, RefreshTokenRequest, RefreshTokenSchema, User, UserCredentials,
    UserCredentialsSchema, UserRegistration, UserRegistrationSchema, UserResponse,
};
