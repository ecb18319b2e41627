//! Note command: attaches structured notes to a recorded session.

use std::io::Write;

use anyhow::{Context, Result};
use deskcare_core::{IntervalStore, WorkNotes, WorkType};
use deskcare_db::Database;

/// Notes given on the command line. `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct NoteUpdate {
    pub formal: Option<String>,
    pub learning: Option<String>,
    pub personal: Option<String>,
    pub work_type: Option<WorkType>,
}

impl NoteUpdate {
    fn apply(self, notes: &mut WorkNotes) {
        if let Some(formal) = self.formal {
            notes.formal = formal;
        }
        if let Some(learning) = self.learning {
            notes.learning = learning;
        }
        if let Some(personal) = self.personal {
            notes.personal = personal;
        }
    }
}

/// Merges `update` into the stored notes of session `id` and writes them back.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, id: i64, update: NoteUpdate) -> Result<()> {
    let interval = db
        .get_interval(id)
        .with_context(|| format!("failed to read session {id}"))?
        .with_context(|| format!("no session with id {id}"))?;

    let work_type = update.work_type.unwrap_or(interval.work_type);
    let mut notes = interval
        .content()
        .map(|content| WorkNotes::parse(content, interval.work_type))
        .unwrap_or_default();
    update.apply(&mut notes);

    let content = if notes.is_empty() {
        String::new()
    } else {
        notes.to_content()
    };
    let updated = db
        .update_interval_content(id, &content, work_type)
        .with_context(|| format!("failed to update session {id}"))?;
    if !updated {
        anyhow::bail!("no session with id {id}");
    }

    tracing::info!(id, %work_type, "updated session notes");
    writeln!(writer, "Updated session #{id} ({work_type})")?;
    Ok(())
}
