use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use common::{DeleteResponse, JobId, LifecycleOutcome, StatusView};
use reqwest::{Client, Response, Url};
use serde_json::Value;
use std::env;

/// - En Docker: SERVER_URL=http://server:8080
/// - Local: default http://localhost:8080
fn server_base_url() -> String {
    env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Arma `<base>/api/prgs/<segmentos...>` escapando cada segmento, así un id
/// con `?`, `#` o `%` no cambia la ruta.
fn api_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("SERVER_URL inválida: {}", base_url))?
        .pop_if_empty()
        .extend(["api", "prgs"])
        .extend(segments);
    Ok(url)
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para consultar el estado de las descargas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consulta el estado de un job (tarea o archivo .prg)
    Status {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Lista todos los jobs conocidos
    List,
    /// Borra un job y su historial
    Delete {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Reintenta una tarea fallida
    Retry {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Cancela una tarea en curso
    Cancel {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
}

/// Si la respuesta no es 2xx, corta con el mensaje que mandó el servidor.
async fn ensure_ok(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("sin detalle");
    bail!("error {}: {}", status, message)
}

fn print_outcome(outcome: &LifecycleOutcome) {
    println!("  estado : {}", outcome.status);
    if let Some(ref msg) = outcome.message {
        println!("  mensaje: {}", msg);
    }
    if let Some(ref id) = outcome.task_id {
        println!("  tarea  : {}", id);
    }
    if let (Some(count), Some(max)) = (outcome.retry_count, outcome.max_retries) {
        println!("  intento: {}/{}", count, max);
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = server_base_url();

    match cli.command {
        Commands::Status { id } => {
            let url = api_url(&base_url, &[id.as_str()])?;
            let resp = ensure_ok(client.get(url).send().await?).await?;
            let view: StatusView = resp.json().await?;

            println!("Job {}:", view.task_id);
            println!("  título : {}", view.display_title);
            println!("  tipo   : {}", view.display_type);
            println!("  artista: {}", view.display_artist);
            match view.event {
                Some(event) => println!("  evento : {:?}", event),
                None => println!("  evento : (aceptado, sin arrancar)"),
            }
            if let Some(ref msg) = view.progress_message {
                println!("  avance : {}", msg);
            }
            if let Some(count) = view.status_count {
                println!("  eventos: {}", count);
            }
            if let Some(ref last) = view.last_line {
                println!("  último : {}", last);
            }
        }

        Commands::List => {
            let url = api_url(&base_url, &["list"])?;
            let resp = ensure_ok(client.get(url).send().await?).await?;
            let ids: Vec<JobId> = resp.json().await?;

            if ids.is_empty() {
                println!("No hay jobs.");
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }

        Commands::Delete { id } => {
            let url = api_url(&base_url, &["delete", id.as_str()])?;
            let resp = ensure_ok(client.delete(url).send().await?).await?;
            let deleted: DeleteResponse = resp.json().await?;
            println!("{}", deleted.message);
        }

        Commands::Retry { id } => {
            let url = api_url(&base_url, &["retry", id.as_str()])?;
            let resp = ensure_ok(client.post(url).send().await?).await?;
            let outcome: LifecycleOutcome = resp.json().await?;
            println!("Reintento de {}:", id);
            print_outcome(&outcome);
        }

        Commands::Cancel { id } => {
            let url = api_url(&base_url, &["cancel", id.as_str()])?;
            let resp = ensure_ok(client.post(url).send().await?).await?;
            let outcome: LifecycleOutcome = resp.json().await?;
            println!("Cancelación de {}:", id);
            print_outcome(&outcome);
        }
    }

    Ok(())
}
