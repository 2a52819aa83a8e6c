use serde::Serialize;
use std::collections::BTreeMap;

use super::list::format_output;
use super::list::table::Table;
use crate::cli::open_store;
use crate::config::{Config, HUB_TOKEN_ENV_VAR};
use crate::deploy::deploy_environment;
use crate::utils::errors::error_chain;
use crate::{die, PlanArgs};

const REDACTED: &str = "<redacted>";

#[derive(Serialize)]
#[serde(transparent)]
struct Environment(BTreeMap<String, String>);

impl Environment {
    fn redact_secrets(&mut self) {
        if let Some(token) = self.0.get_mut(HUB_TOKEN_ENV_VAR) {
            *token = REDACTED.to_string();
        }
    }
}

impl From<Environment> for Table {
    fn from(value: Environment) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["VARIABLE", "VALUE"]);

        for (name, value) in value.0 {
            tab.add_row(vec![name, value]);
        }

        tab
    }
}

pub(crate) fn plan_cmd(config: &Config, args: &PlanArgs) {
    let store = open_store(config);

    let record = match store.get_by_endpoint(&args.endpoint) {
        Ok(Some(record)) => record,
        Ok(None) => die!("no record for endpoint \"{}\"", args.endpoint),
        Err(err) => die!("{}", error_chain(&err)),
    };

    let model = match record.primary_model() {
        Some(model) => model,
        None => die!("endpoint \"{}\" does not list any models", args.endpoint),
    };

    let token = config.hub.token();

    let mut env = Environment(deploy_environment(
        &record.deployment,
        model,
        token.as_deref(),
    ));

    if !args.show_secrets {
        env.redact_secrets();
    }

    format_output(env, args.format);
}
