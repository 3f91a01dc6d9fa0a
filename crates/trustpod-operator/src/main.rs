/*
 *  Copyright 2026 Trustpod Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use std::sync::Arc;

use clap::Parser;
use kube::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trustpod_operator::config::{Cli, Settings};
use trustpod_operator::discovery;
use trustpod_operator::reconcile::{run_controllers, Context};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let settings = Settings::from_cli(&cli);
    info!(
        namespace = %settings.namespace,
        listen_addr = %settings.listen_addr,
        "starting operator"
    );

    let client = Client::try_default().await?;
    let listen_addr = settings.listen_addr;
    let context = Arc::new(Context { client, settings });

    tokio::select! {
        result = discovery::serve(listen_addr) => result,
        _ = run_controllers(context) => Ok(()),
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trustpod={default},trustpod_operator={default}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
