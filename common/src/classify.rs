use serde_json::{json, Value};

use crate::event::{self, status_of, StatusEvent};
use crate::view::{EventCategory, ProgressDetails};

/// Resultado de clasificar el último evento de un job.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: EventCategory,
    pub progress_message: Option<String>,
    pub details: ProgressDetails,
}

/// Clasifica `latest` y arma el mensaje de avance. `history` es la lista
/// completa de eventos en orden (se usa para el caso `processing`).
///
/// Nunca falla: cualquier forma desconocida termina como `update` con el
/// mejor mensaje posible.
pub fn classify(latest: &Value, history: &[Value]) -> Classification {
    let category = EventCategory::from_status(status_of(latest));
    let mut details = ProgressDetails::default();

    let progress_message = match StatusEvent::decode(latest) {
        StatusEvent::Terminal { outcome, message } => {
            Some(message.unwrap_or_else(|| outcome.default_message().to_string()))
        }

        StatusEvent::Track(t) => {
            let current = t.current.unwrap_or(0);
            let total = t.total.unwrap_or(0);
            let progress = t.overall_progress.unwrap_or_else(|| json!(0));

            let message = if current > 0 && total > 0 {
                format!(
                    "Downloading track {}/{} ({}%): {}",
                    current,
                    total,
                    render(&progress),
                    t.track
                )
            } else {
                format!("Downloading: {}", t.track)
            };

            details.current_track = Some(t.track);
            details.track_number = Some(current);
            details.total_tracks = Some(total);
            details.progress_percent = Some(progress);
            details.album = Some(t.album.unwrap_or_default());
            Some(message)
        }

        StatusEvent::RealTime(rt) => {
            let percent = rt.percent.unwrap_or_else(|| json!(0));
            let message = match &rt.song {
                Some(song) => format!("Downloading {} ({}%)", song, render(&percent)),
                None => format!("Downloading ({}%)", render(&percent)),
            };

            details.current_song = Some(rt.song.unwrap_or_default());
            details.percent = Some(percent);
            details.percentage = Some(rt.percentage.unwrap_or_else(|| json!(0)));
            details.time_elapsed = Some(rt.time_elapsed.unwrap_or_else(|| json!(0)));
            Some(message)
        }

        StatusEvent::Initializing { album } => Some(match album {
            Some(album) => format!("Initializing download for {album}"),
            None => "Initializing download...".to_string(),
        }),

        StatusEvent::Processing { message } => Some(
            processing_from_history(history, &mut details).unwrap_or_else(|| {
                message.unwrap_or_else(|| "Processing download...".to_string())
            }),
        ),

        StatusEvent::Generic { status, message } => {
            Some(message.unwrap_or_else(|| format!("Status: {status}")))
        }
    };

    Classification {
        category,
        progress_message,
        details,
    }
}

/// Busca hacia atrás el último evento de pista y arma el mensaje de
/// "processing" con él. Recorrido lineal, se detiene en el primero.
fn processing_from_history(history: &[Value], details: &mut ProgressDetails) -> Option<String> {
    let found = history.iter().rev().find(|ev| event::is_track_event(ev))?;

    let track = found
        .get("track")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    details.current_track = Some(track.clone());

    let fraction = found
        .get("current_track")
        .and_then(Value::as_str)
        .and_then(event::parse_fraction);

    Some(match fraction {
        Some((current, total)) => {
            details.track_number = Some(current);
            details.total_tracks = Some(total);
            details.progress_percent = Some(json!(event::percent_of(current, total)));
            format!("Processing track {current}/{total}: {track}")
        }
        None => format!("Processing: {track}"),
    })
}

/// Texto de un valor JSON tal cual, sin comillas para strings.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
