use std::fmt::{self, Display, Formatter};
use std::io;

use tagsmith::id3v2::Field;

/// Parse a `--fields` argument into a field filter.
pub fn parse_fields<'a>(args: impl Iterator<Item = &'a str>) -> Result<Vec<Field>, OpError> {
    let mut fields = Vec::new();

    for arg in args {
        match Field::from_name(&arg.to_lowercase()) {
            Some(field) => fields.push(field),
            None => return Err(OpError::InvalidField(arg.to_string())),
        }
    }

    Ok(fields)
}

pub enum OpError {
    IoError(io::Error),
    InvalidField(String),
    MalformedMetadata,
    NoMetadata,
}

impl Display for OpError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            OpError::IoError(err) => write!(f, "{}", err),
            OpError::InvalidField(name) => write!(f, "no such field \"{}\"", name),
            OpError::MalformedMetadata => write!(f, "could not parse metadata"),
            OpError::NoMetadata => write!(f, "no metadata present"),
        }
    }
}

impl From<io::Error> for OpError {
    fn from(err: io::Error) -> Self {
        OpError::IoError(err)
    }
}
