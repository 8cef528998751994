use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Envelope used by mutating endpoints: a human-readable message plus the record.
#[derive(Serialize, Debug)]
pub struct Acknowledged<T: Serialize> {
    pub message: String,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Acknowledged<T> {
    pub fn new(message: impl Into<String>, body: T) -> Self {
        Self { message: message.into(), body }
    }
}
