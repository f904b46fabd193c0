use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Pwdex(#[from] pwdex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot already exists in '{path}'. Use --force to overwrite.")]
    SnapshotExists { path: PathBuf },

    #[error("'{value}' is not a 40-character hex SHA-1 digest")]
    BadDigest { value: String },

    #[error("provide a password or --sha1 <HEX>")]
    MissingSecret,
}
