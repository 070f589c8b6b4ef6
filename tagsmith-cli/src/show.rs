use clap::Values;

use tagsmith::err::ParseError;
use tagsmith::file::SourceFile;
use tagsmith::id3v2::{Field, ParseOptions};
use tagsmith::tag::TagData;

use crate::args::{self, OpError};

pub fn show<'a>(paths: Values<'a>, fields: Option<Values<'a>>, all: bool) -> Result<(), OpError> {
    // An invalid field name is a usage error; a file that fails to parse
    // is only worth a complaint before moving on.
    let filter = match fields {
        Some(fields) => Some(args::parse_fields(fields)?),
        None => None,
    };

    for path in paths {
        if let Err(err) = show_file(path, &filter, all) {
            errorln!("{}: {}", path, err);
        }
    }

    Ok(())
}

fn show_file(path: &str, filter: &Option<Vec<Field>>, all: bool) -> Result<(), OpError> {
    let mut file = SourceFile::open(path)?;

    let options = ParseOptions {
        read_all_meta_frames: all,
    };

    let mut data = TagData::new();

    let header = file.id3v2(&options, &mut data).map_err(|err| match err {
        ParseError::IoError(err) => OpError::IoError(err),
        _ => OpError::MalformedMetadata,
    })?;

    let header = match header {
        Some(header) => header,
        None => return Err(OpError::NoMetadata),
    };

    print_header!("{} [ID3v2.{}.{}]", path, header.version(), header.revision());

    for (field, value) in data.fields() {
        if let Some(filter) = filter {
            if !filter.contains(&field) {
                continue;
            }
        }

        print_entry!("{}", field);
        println!(": {}", value);
    }

    if all {
        for extra in data.additional.iter() {
            print_entry!("\"{}\"", extra.id);
            println!(": {}", extra.value);
        }
    }

    for picture in data.pictures() {
        print_entry!("picture");
        println!(
            ": {:?} #{} {} ({} bytes)",
            picture.pic_type,
            picture.position,
            picture.format.mime(),
            picture.data.len()
        );
    }

    Ok(())
}
