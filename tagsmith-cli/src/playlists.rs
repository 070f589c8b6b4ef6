use clap::Values;

use tagsmith::playlist::PlaylistRegistry;

use crate::args::OpError;

pub fn probe(paths: Values) -> Result<(), OpError> {
    let registry = PlaylistRegistry::global();

    for path in paths {
        let io = registry.io_for_path(path);

        if io.is_stub() {
            println!("{}: unknown playlist format", path);
        } else {
            print_entry!("{}", path);
            println!(": {} [{:?} URIs]", io.name(), io.uri_style());
        }
    }

    Ok(())
}
