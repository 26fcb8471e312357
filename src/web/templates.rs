use std::fmt::Write as _;
use std::time::Duration;

use crate::backup::BackupSnapshot;
use crate::session::state::{STATUS_ERROR, STATUS_SAVED_PREFIX, STATUS_SAVING, STATUS_TYPING};
use crate::session::{EditSession, EditorView};

const VIEWPORT: &str = r#"<meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no">"#;

const EDITOR_STYLE: &str = r#"<style>
  #saveStatus { color: #666; font-style: italic; margin-left: 10px; }
  textarea { width: 100%; height: 50vh; font-family: monospace; font-size: 16px; }
</style>"#;

const BACKUP_STYLE: &str = r#"<style>
  textarea { width: 100%; height: 50vh; font-family: monospace; }
</style>"#;

const EDITOR_SCRIPT: &str = r#"<script>
document.addEventListener('DOMContentLoaded', function () {
  const textarea = document.querySelector('textarea[name="content"]');
  const status = document.getElementById('saveStatus');
  let timer = null;

  function save() {
    timer = null;
    status.textContent = NOTES.saving;
    fetch('/', {
      method: 'POST',
      headers: {
        'Content-Type': 'application/x-www-form-urlencoded',
        'X-Requested-With': 'XMLHttpRequest'
      },
      body: new URLSearchParams({ content: textarea.value })
    })
      .then(function (response) {
        if (!response.ok) {
          throw new Error(response.statusText);
        }
        return response.text();
      })
      .then(function (stamp) {
        if (timer === null) {
          status.textContent = NOTES.savedPrefix + stamp;
        }
      })
      .catch(function () {
        if (timer === null) {
          status.textContent = NOTES.error;
        }
      });
  }

  textarea.addEventListener('input', function () {
    status.textContent = NOTES.typing;
    clearTimeout(timer);
    timer = setTimeout(save, NOTES.debounceMs);
  });

  document.querySelector('form').addEventListener('submit', function () {
    clearTimeout(timer);
    timer = null;
    status.textContent = NOTES.saving;
  });

  const viewButton = document.getElementById('viewBackupBtn');
  if (viewButton) {
    viewButton.addEventListener('click', function () {
      const selected = document.getElementById('backupSelect').value;
      if (selected) {
        window.open('/backup/' + encodeURIComponent(selected), '_blank');
      }
    });
  }
});
</script>"#;

const BACKUP_SCRIPT: &str = r#"<script>
document.getElementById('restoreBtn').addEventListener('click', function () {
  if (!confirm('Are you sure you want to restore this backup? Current content will be overwritten.')) {
    return;
  }
  const form = document.createElement('form');
  form.method = 'POST';
  form.action = '/';
  const input = document.createElement('input');
  input.type = 'hidden';
  input.name = 'content';
  input.value = document.getElementById('backupContent').value;
  form.appendChild(input);
  document.body.appendChild(form);
  form.submit();
});
</script>"#;

pub fn editor_page(view: &EditorView, debounce_ms: u64) -> String {
    let session = EditSession::new(Duration::from_millis(debounce_ms), view.last_saved.as_str());
    let debounce_ms = session.debounce().as_millis();
    let mut out = String::with_capacity(view.content.len() + 4096);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<title>Notes</title>\n");
    out.push_str(VIEWPORT);
    let _ = write!(
        out,
        "\n<script>const NOTES = {{ debounceMs: {debounce_ms}, typing: \"{STATUS_TYPING}\", \
         saving: \"{STATUS_SAVING}\", savedPrefix: \"{STATUS_SAVED_PREFIX}\", error: \"{STATUS_ERROR}\" }};</script>\n"
    );
    out.push_str(EDITOR_SCRIPT);
    out.push_str(EDITOR_STYLE);
    out.push_str("\n</head>\n<body>\n<form method=\"post\">\n");
    // The parser drops one leading newline inside <textarea>; emit it ourselves.
    let _ = write!(
        out,
        "<textarea name=\"content\">\n{}</textarea>\n",
        html_escape(&view.content)
    );
    let _ = write!(
        out,
        "<p><button>Save</button> <small>(Autosaves after {debounce_ms} ms without edits)</small></p>\n"
    );
    let _ = write!(
        out,
        "<p>Editing: {} <span id=\"saveStatus\">{}</span></p>\n",
        html_escape(&view.notes_file.display().to_string()),
        html_escape(&session.status_text())
    );
    let _ = write!(
        out,
        "<p><small>{} backups available in {} (keeping the last hour of changes)</small></p>\n",
        view.backups.len(),
        html_escape(&view.backup_dir.display().to_string())
    );
    out.push_str("</form>\n");
    if !view.backups.is_empty() {
        out.push_str(
            "<div style=\"margin-top: 10px;\">\n<label for=\"backupSelect\">View backup: </label>\n\
             <select id=\"backupSelect\">\n<option value=\"\">Select a backup</option>\n",
        );
        for entry in &view.backups {
            let _ = writeln!(
                out,
                "<option value=\"{}\">{}</option>",
                html_escape(entry.name.as_str()),
                html_escape(&entry.label)
            );
        }
        out.push_str(
            "</select>\n<button type=\"button\" id=\"viewBackupBtn\">View</button>\n</div>\n",
        );
    }
    out.push_str("</body>\n</html>\n");
    out
}

pub fn backup_page(snapshot: &BackupSnapshot) -> String {
    let label = html_escape(&snapshot.label);
    let content = String::from_utf8_lossy(&snapshot.content);
    let mut out = String::with_capacity(content.len() + 2048);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    out.push_str(VIEWPORT);
    let _ = write!(out, "\n<title>Backup: {label}</title>\n");
    out.push_str(BACKUP_STYLE);
    let _ = write!(out, "\n</head>\n<body>\n<h1>Backup from {label}</h1>\n");
    out.push_str(
        "<div class=\"buttons\">\n<button onclick=\"window.close()\">Close</button>\n\
         <button onclick=\"window.location.href='/'\">Back to Editor</button>\n\
         <button id=\"restoreBtn\">Restore This Version</button>\n</div>\n",
    );
    let _ = write!(
        out,
        "<textarea id=\"backupContent\" readonly>\n{}</textarea>\n",
        html_escape(&content)
    );
    out.push_str(BACKUP_SCRIPT);
    out.push_str("\n</body>\n</html>\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
