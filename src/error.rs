use thiserror::Error;

/// Errors raised by document store adapters.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, TLS, connection reset, ...)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store answered with a non-success status code
    #[error("Store returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The store answered with a body we could not interpret
    #[error("Unexpected store payload: {0}")]
    Decode(String),

    /// The path is not usable (empty segment, reserved characters)
    #[error("Invalid store path: {0}")]
    InvalidPath(String),
}

/// Errors raised by asset host adapters.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// Error reported by S3 or an S3-compatible service
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The host refused the request
    #[error("Asset host rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The host answered with a body we could not interpret
    #[error("Unexpected asset host payload: {0}")]
    Decode(String),
}

/// Errors raised while delivering one-time codes.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("No recipient configured for one-time codes")]
    NoRecipient,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Authentication and session failures.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Submitted email/password do not match the stored record
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No artifact (cookie, bearer token, session id) was presented
    #[error("Authentication required")]
    Unauthenticated,

    /// An artifact was presented but failed verification
    #[error("Invalid authentication artifact: {reason}")]
    InvalidArtifact { reason: ArtifactRejection },

    /// No one-time code was requested for this client
    #[error("No one-time code has been issued")]
    OtpNotIssued,

    /// The one-time code expired before verification
    #[error("One-time code expired")]
    OtpExpired,

    /// The submitted one-time code does not match
    #[error("One-time code does not match")]
    OtpMismatch,

    /// The credential record could not be loaded
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    /// The one-time code could not be delivered
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

/// Why a presented artifact was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArtifactRejection {
    #[error("malformed")]
    Malformed,

    #[error("bad signature")]
    BadSignature,

    #[error("expired")]
    Expired,

    #[error("unknown session")]
    UnknownSession,
}

/// Gallery operation failures (upload, list, delete).
#[derive(Debug, Clone, Error)]
pub enum GalleryError {
    /// The upload request carried no file parts
    #[error("No files provided")]
    NoFilesProvided,

    /// A file part had no content
    #[error("File '{filename}' is empty")]
    EmptyFile { filename: String },

    /// A file is not an image
    #[error("File '{filename}' has unsupported type '{content_type}' (expected image/*)")]
    UnsupportedFileType {
        filename: String,
        content_type: String,
    },

    /// A file exceeds the configured size limit
    #[error("File '{filename}' is {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },

    /// At least one host upload in the batch failed; nothing was committed
    #[error("Upload failed for {failed} of {total} file(s): {message}")]
    UpstreamUploadFailure {
        failed: usize,
        total: usize,
        message: String,
    },

    /// A required request parameter is missing or blank
    #[error("Missing required parameter(s): {0}")]
    MissingParameters(String),

    /// The host did not confirm deletion; the record was kept
    #[error("Remote delete of '{public_id}' failed: {reason}")]
    RemoteDeleteFailed { public_id: String, reason: String },

    /// The request body could not be read
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Metadata store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
