use crate::cli::open_store;
use crate::config::Config;
use crate::utils::errors::error_chain;
use crate::{die, ShowArgs};

pub(crate) fn show_cmd(config: &Config, args: &ShowArgs) {
    let store = open_store(config);

    let deployment = match store.get_by_endpoint(&args.endpoint) {
        Ok(Some(deployment)) => deployment,
        Ok(None) => die!("no record for endpoint \"{}\"", args.endpoint),
        Err(err) => die!("{}", error_chain(&err)),
    };

    match serde_json::to_string_pretty(&deployment) {
        Ok(output) => println!("{}", output),
        Err(err) => die!("failed to serialize the record: {}", err),
    }
}
