use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use juros::api::run_http_server;
use juros::core::{SimulationInputs, project};
use juros::rate::{DEFAULT_SERIES, RateObservation, SgsClient};

#[derive(Parser, Debug)]
#[command(
    name = "juros",
    about = "Compound interest simulator backed by the Banco Central do Brasil rate feed"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web frontend and JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = DEFAULT_SERIES, help = "SGS series id to fetch rates from")]
        series: u32,
    },
    /// Print the latest published rate and exit
    Rate {
        #[arg(long, default_value_t = DEFAULT_SERIES, help = "SGS series id to fetch rates from")]
        series: u32,
    },
    /// Run one projection and print the period balances
    Simulate {
        #[arg(long, default_value_t = 0.0)]
        amount: f64,
        #[arg(
            long,
            help = "Annual rate in percent; fetched from the rate feed when omitted"
        )]
        annual_rate_percent: Option<f64>,
        #[arg(long, default_value_t = 1.0)]
        years: f64,
        #[arg(long, default_value_t = 12)]
        compounds_per_year: u32,
        #[arg(long, default_value_t = 0.0)]
        periodic_contribution: f64,
        #[arg(long, default_value_t = DEFAULT_SERIES, help = "SGS series id to fetch rates from")]
        series: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "juros=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Serve { port, series } => {
            let client = build_client(series);
            if let Err(e) = run_http_server(port, client).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Rate { series } => {
            let observation = fetch_or_exit(&build_client(series), series).await;
            println!(
                "Series {series}: {}% on {}",
                observation.value, observation.date
            );
        }
        Command::Simulate {
            amount,
            annual_rate_percent,
            years,
            compounds_per_year,
            periodic_contribution,
            series,
        } => {
            let annual_rate_percent = match annual_rate_percent {
                Some(rate) => rate,
                None => {
                    let observation = fetch_or_exit(&build_client(series), series).await;
                    println!(
                        "Using series {series} rate {}% from {}",
                        observation.value, observation.date
                    );
                    observation.value
                }
            };

            let result = project(&SimulationInputs {
                principal: amount,
                annual_rate_percent,
                years,
                compounds_per_year,
                periodic_contribution,
            });

            println!("{:>6}  {:>14}", "period", "balance");
            for entry in &result.series {
                println!("{:>6}  {:>14.2}", entry.period, entry.balance);
            }
            println!("Final balance: {:.2}", result.final_balance);
        }
    }
}

fn build_client(series: u32) -> SgsClient {
    match SgsClient::new(series) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Rate client error: {e}");
            std::process::exit(1);
        }
    }
}

async fn fetch_or_exit(client: &SgsClient, series: u32) -> RateObservation {
    match client.fetch_latest().await {
        Some(observation) => observation,
        None => {
            eprintln!("No rate available for series {series}");
            std::process::exit(1);
        }
    }
}
