mod input;
mod prompt;

use serde_json::{Map, Value};
use std::io::{self, IsTerminal, Read};

use self::input::TerminalInput;
use crate::backends::{Backends, ErrorKind};
use crate::cli::{hub_api, open_store};
use crate::config::Config;
use crate::dispatch::{self, AuxiliaryInput, Dispatcher, Query, StrictInput};
use crate::hyperparameters::{parse_value, QueryParameters};
use crate::utils::errors::error_chain;
use crate::{die, warn, QueryArgs};

/// Builds request parameters out of `key=value` pairs. Values are typed the
/// same way as stored defaults.
fn query_parameters(params: &[(String, String)]) -> Result<Option<QueryParameters>, serde_json::Error> {
    if params.is_empty() {
        return Ok(None);
    }

    let map: Map<String, Value> = params
        .iter()
        .map(|(key, value)| (key.clone(), parse_value(value)))
        .collect();

    serde_json::from_value(Value::Object(map)).map(Some)
}

fn read_query(args: &QueryArgs, terminal: &TerminalInput, interactive: bool) -> String {
    if let Some(query) = &args.query {
        return query.clone();
    }

    if interactive {
        return match terminal.read_line("query") {
            Ok(Some(query)) => query,
            Ok(None) => die!("no query was given"),
            Err(err) => die!("failed to read the query: {}", err),
        };
    }

    let mut query = String::new();

    if let Err(err) = io::stdin().read_to_string(&mut query) {
        die!("failed to read the query from stdin: {}", err);
    }

    query.trim_end_matches(['\r', '\n']).to_string()
}

pub(crate) async fn query_cmd(config: &Config, args: &QueryArgs) {
    let parameters = match query_parameters(&args.params) {
        Ok(parameters) => parameters,
        Err(err) => die!("invalid query parameters: {}", err),
    };

    let interactive = !args.no_input && io::stdin().is_terminal();

    let terminal = TerminalInput::new(&args.endpoint);

    let mut query = Query::new(&read_query(args, &terminal, interactive));

    query.context = args.context.clone();
    query.parameters = parameters;

    if query.query.trim().is_empty() {
        die!("the query is empty");
    }

    let store = open_store(config);

    let hub = hub_api(config);

    let backends = match Backends::from_config(&config.backends) {
        Ok(backends) => backends,
        Err(err) => die!("failed to configure the backends: {}", error_chain(&err)),
    };

    let input: &dyn AuxiliaryInput = if interactive { &terminal } else { &StrictInput };

    let dispatcher = Dispatcher::new(&store, &hub, &backends, input);

    let response = match dispatcher.dispatch(&args.endpoint, &query).await {
        Ok(response) => response,
        Err(err) => {
            if let dispatch::Error::Backend { source, .. } = &err {
                if source.kind() == ErrorKind::BadRequest {
                    warn!("the endpoint may serve a different task than the one recorded");
                }
            }

            die!("{}", error_chain(&err))
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(output) => println!("{}", output),
        Err(err) => die!("failed to format the response: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_parameters() {
        assert_eq!(query_parameters(&[]).unwrap(), None);
    }

    #[test]
    fn test_parameters_are_typed() {
        let parameters = query_parameters(&pairs(&[("temperature", "0.2"), ("top_k", "50")]))
            .unwrap()
            .unwrap();

        assert_eq!(
            serde_json::to_value(parameters).unwrap(),
            json!({ "temperature": 0.2, "top_k": 50 })
        );
    }

    #[test]
    fn test_unknown_parameters_are_rejected() {
        assert!(query_parameters(&pairs(&[("temprature", "0.2")])).is_err());
        assert!(query_parameters(&pairs(&[("top_k", "many")])).is_err());
    }
}
