#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argspec: {0}")]
    BadToken(String),

    #[error("unsupported argument type: {0}")]
    BadFormat(String),

    #[error("unsupported argument size: {0}")]
    BadSize(String),

    #[error("invalid enum spec: {0}")]
    BadEnum(String),

    #[error("invalid struct spec: {0}")]
    BadStruct(String),

    #[error("unknown register name: {0}")]
    UnknownRegister(String),

    #[error("std::string display for libc++.so is not supported")]
    StdStringUnsupported,

    #[error("unknown architecture: {0}")]
    UnknownArch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
