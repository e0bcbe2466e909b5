use crate::types::segment::{MIN_DURATION, Rgb};
use crate::types::template::{Template, new_template_id};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Duration must be > 0")]
    InvalidDuration,
    #[error("No template with id {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum TemplateImportError {
    #[error("Invalid templates JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid templates JSON: expected an array")]
    NotAnArray,
}

/// The ordered template presets shown as quick-add buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Uses the stored list, or the default presets when nothing usable was
    /// stored.
    pub fn from_stored(stored: Option<Vec<Template>>) -> Self {
        let templates = match stored {
            Some(list) if !list.is_empty() => list,
            _ => Template::defaults(),
        };
        TemplateLibrary { templates }
    }

    pub fn all(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Validates the form input and either appends a new template (`id` is
    /// `None`) or overwrites the fields of an existing one. Returns the id.
    pub fn save(
        &mut self,
        id: Option<&str>,
        title: &str,
        duration: f64,
        color: Rgb,
    ) -> Result<String, TemplateError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TemplateError::MissingTitle);
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TemplateError::InvalidDuration);
        }
        let duration = duration.max(MIN_DURATION);

        match id {
            None => {
                let template = Template::new(title, duration, color);
                let id = template.id.clone();
                self.templates.push(template);
                Ok(id)
            }
            Some(id) => {
                let template = self
                    .templates
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
                template.title = title.to_string();
                template.duration = duration;
                template.color = color;
                Ok(template.id.clone())
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Template> {
        let idx = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(idx))
    }

    /// Drag-and-drop reorder: takes the template at `from` out and reinserts it
    /// at `to`. Out-of-range indices and `from == to` change nothing.
    pub fn move_template(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.templates.len() || to >= self.templates.len() {
            return false;
        }
        let item = self.templates.remove(from);
        self.templates.insert(to, item);
        true
    }

    /// Appends templates from a JSON array. Entries without a title are
    /// skipped; a missing or non-numeric duration becomes 5 and a missing
    /// colour the fallback. Every imported template gets a fresh id.
    pub fn import_json(&mut self, json: &str) -> Result<usize, TemplateImportError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(entries) = value else {
            return Err(TemplateImportError::NotAnArray);
        };

        let mut imported = 0;
        for entry in &entries {
            let title = match entry.get("title").and_then(Value::as_str) {
                Some(t) if !t.is_empty() => t,
                _ => continue,
            };
            let duration = entry
                .get("duration")
                .and_then(number_like)
                .filter(|d| d.is_finite() && *d != 0.0)
                .unwrap_or(5.0);
            let color = entry
                .get("color")
                .and_then(Value::as_str)
                .and_then(Rgb::parse_hex)
                .unwrap_or(Rgb::FALLBACK);
            self.templates.push(Template {
                id: new_template_id(),
                title: title.to_string(),
                duration,
                color,
            });
            imported += 1;
        }
        info!("Imported {imported} of {} templates", entries.len());
        Ok(imported)
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.templates)
    }
}

/// Accepts JSON numbers and numeric strings, as hand-edited files carry both.
fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(lib: &TemplateLibrary) -> Vec<&str> {
        lib.all().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let lib = TemplateLibrary::from_stored(None);
        assert_eq!(titles(&lib), vec!["Intro", "Main", "Outro"]);
        let lib = TemplateLibrary::from_stored(Some(Vec::new()));
        assert_eq!(lib.len(), 3);

        let stored = vec![Template::new("Cold open", 3.0, Rgb::FALLBACK)];
        let lib = TemplateLibrary::from_stored(Some(stored));
        assert_eq!(titles(&lib), vec!["Cold open"]);
    }

    #[test]
    fn test_save_validates_input() {
        let mut lib = TemplateLibrary::from_stored(None);
        assert_eq!(
            lib.save(None, "   ", 3.0, Rgb::FALLBACK),
            Err(TemplateError::MissingTitle)
        );
        assert_eq!(
            lib.save(None, "Bumper", 0.0, Rgb::FALLBACK),
            Err(TemplateError::InvalidDuration)
        );
        assert_eq!(
            lib.save(None, "Bumper", f64::NAN, Rgb::FALLBACK),
            Err(TemplateError::InvalidDuration)
        );
        assert_eq!(lib.len(), 3);
    }

    #[test]
    fn test_save_creates_then_edits() {
        let mut lib = TemplateLibrary::from_stored(None);
        let id = lib.save(None, " Bumper ", 0.05, Rgb::FALLBACK).unwrap();
        let created = lib.get(&id).unwrap();
        assert_eq!(created.title, "Bumper");
        assert_eq!(created.duration, MIN_DURATION);

        let blue = Rgb::new(0, 0, 255);
        assert_eq!(lib.save(Some(&id), "Sting", 2.0, blue).unwrap(), id);
        let edited = lib.get(&id).unwrap();
        assert_eq!(edited.title, "Sting");
        assert_eq!(edited.duration, 2.0);
        assert_eq!(edited.color, blue);

        assert_eq!(
            lib.save(Some("missing"), "x", 1.0, blue),
            Err(TemplateError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_remove_and_reorder() {
        let mut lib = TemplateLibrary::from_stored(None);
        assert!(lib.move_template(2, 0));
        assert_eq!(titles(&lib), vec!["Outro", "Intro", "Main"]);
        assert!(!lib.move_template(1, 1));
        assert!(!lib.move_template(0, 9));

        let removed = lib.remove("t1").unwrap();
        assert_eq!(removed.title, "Intro");
        assert_eq!(titles(&lib), vec!["Outro", "Main"]);
        assert!(lib.remove("t1").is_none());
    }

    #[test]
    fn test_import_applies_defaults_and_skips_untitled() {
        let mut lib = TemplateLibrary::from_stored(None);
        let json = r##"[
            {"title": "Ad break", "duration": 30, "color": "#ff0000"},
            {"title": "Stinger", "duration": "2.5"},
            {"duration": 4},
            {"title": "", "duration": 4},
            {"title": "Plain", "duration": "soon", "color": "nope"}
        ]"##;
        assert_eq!(lib.import_json(json).unwrap(), 3);
        assert_eq!(
            titles(&lib),
            vec!["Intro", "Main", "Outro", "Ad break", "Stinger", "Plain"]
        );
        let stinger = &lib.all()[4];
        assert_eq!(stinger.duration, 2.5);
        assert_eq!(stinger.color, Rgb::FALLBACK);
        let plain = &lib.all()[5];
        assert_eq!(plain.duration, 5.0);
        assert_eq!(plain.color, Rgb::FALLBACK);

        let ids: std::collections::HashSet<_> = lib.all().iter().map(|t| &t.id).collect();
        assert_eq!(ids.len(), lib.len());
    }

    #[test]
    fn test_import_rejects_non_arrays() {
        let mut lib = TemplateLibrary::from_stored(None);
        assert!(matches!(
            lib.import_json(r#"{"title": "x"}"#),
            Err(TemplateImportError::NotAnArray)
        ));
        assert!(matches!(
            lib.import_json("[{"),
            Err(TemplateImportError::Malformed(_))
        ));
        assert_eq!(lib.len(), 3);
    }

    #[test]
    fn test_export_is_readable_by_import() {
        let lib = TemplateLibrary::from_stored(None);
        let json = lib.export_json().unwrap();
        assert!(json.contains("\"#ffd166\""));
        let mut other = TemplateLibrary::from_stored(Some(vec![Template::new(
            "Only",
            1.0,
            Rgb::FALLBACK,
        )]));
        assert_eq!(other.import_json(&json).unwrap(), 3);
        assert_eq!(titles(&other), vec!["Only", "Intro", "Main", "Outro"]);
    }
}
