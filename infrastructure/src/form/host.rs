//! Form collaborators over a [`FormDocument`]

use super::document::{FilledAnswer, FilledForm, FormDocument, FormField};
use async_trait::async_trait;
use docfiller_application::{
    FieldClassifier, FieldError, FieldExtractor, FieldSource, Filler, PrefilledChecker,
};
use docfiller_domain::{AnswerPayload, FieldHandle, FieldType, FieldValue, RunMetrics};
use std::sync::Mutex;
use tracing::debug;

/// Serves fields from a JSON document and collects the answers written
/// back, in fill order.
pub struct JsonFormHost {
    document: FormDocument,
    filled: Mutex<Vec<FilledAnswer>>,
    skipped: Mutex<Vec<String>>,
}

impl JsonFormHost {
    pub fn new(document: FormDocument) -> Self {
        Self {
            document,
            filled: Mutex::new(Vec::new()),
            skipped: Mutex::new(Vec::new()),
        }
    }

    pub fn document(&self) -> &FormDocument {
        &self.document
    }

    fn lookup(&self, handle: &FieldHandle) -> Result<&FormField, FieldError> {
        self.document
            .field(handle.as_str())
            .ok_or_else(|| FieldError::NotFound(handle.to_string()))
    }

    pub fn filled_answers(&self) -> Vec<FilledAnswer> {
        self.filled
            .lock()
            .map(|filled| filled.clone())
            .unwrap_or_default()
    }

    /// Output document for this run
    pub fn output(&self, metrics: Option<RunMetrics>) -> FilledForm {
        FilledForm {
            answers: self.filled_answers(),
            skipped: self
                .skipped
                .lock()
                .map(|skipped| skipped.clone())
                .unwrap_or_default(),
            metrics,
        }
    }
}

#[async_trait]
impl FieldSource for JsonFormHost {
    async fn extract_fields(&self) -> Result<Vec<FieldHandle>, FieldError> {
        Ok(self.document.fields.iter().map(FormField::handle).collect())
    }
}

#[async_trait]
impl FieldClassifier for JsonFormHost {
    async fn classify(&self, handle: &FieldHandle) -> Option<FieldType> {
        let field = self.document.field(handle.as_str())?;
        match field.kind.parse() {
            Ok(field_type) => Some(field_type),
            Err(_) => {
                debug!("Field {} has unknown type '{}'", handle, field.kind);
                None
            }
        }
    }
}

#[async_trait]
impl FieldExtractor for JsonFormHost {
    async fn extract(
        &self,
        handle: &FieldHandle,
        field_type: FieldType,
    ) -> Result<FieldValue, FieldError> {
        let field = self.lookup(handle)?;
        let value = field.to_field_value();

        let missing = match field_type {
            FieldType::Dropdown
            | FieldType::LinearScale
            | FieldType::MultipleChoice
            | FieldType::MultipleChoiceWithOther
            | FieldType::MultiCorrect
            | FieldType::MultiCorrectWithOther
                if value.options.is_empty() =>
            {
                Some("options")
            }
            FieldType::MultipleChoiceGrid | FieldType::CheckboxGrid
                if value.rows.is_empty() || value.columns.is_empty() =>
            {
                Some("rows or columns")
            }
            _ => None,
        };
        if let Some(what) = missing {
            return Err(FieldError::Extraction {
                handle: handle.to_string(),
                message: format!("{} field has no {}", field_type, what),
            });
        }

        Ok(value)
    }
}

#[async_trait]
impl PrefilledChecker for JsonFormHost {
    async fn is_already_answered(&self, _field_type: FieldType, field: &FieldValue) -> bool {
        self.document
            .field(field.handle.as_str())
            .is_some_and(FormField::is_answered)
    }
}

#[async_trait]
impl Filler for JsonFormHost {
    async fn fill(
        &self,
        field_type: FieldType,
        field: &FieldValue,
        answer: &AnswerPayload,
    ) -> Result<bool, FieldError> {
        let entry = FilledAnswer {
            id: field.handle.to_string(),
            kind: field_type.as_str().to_string(),
            value: answer.clone(),
        };
        match self.filled.lock() {
            Ok(mut filled) => {
                filled.push(entry);
                Ok(true)
            }
            Err(_) => Err(FieldError::Fill {
                handle: field.handle.to_string(),
                message: "answer buffer poisoned".to_string(),
            }),
        }
    }

    async fn mark_skipped(&self, field: &FieldValue) {
        if let Ok(mut skipped) = self.skipped.lock() {
            skipped.push(field.handle.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfiller_domain::OptionChoice;

    fn host() -> JsonFormHost {
        JsonFormHost::new(
            FormDocument::from_json(
                r#"{"fields": [
                    {"id": "name", "type": "text", "title": "Name", "answer": "Ada"},
                    {"id": "colour", "type": "multiple_choice", "title": "Colour",
                     "options": ["Red", "Blue"]},
                    {"id": "captcha", "type": "recaptcha", "title": "Prove it"},
                    {"id": "rate", "type": "linear_scale", "title": "Rate us"}
                ]}"#,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_source_and_classifier() {
        let host = host();
        let handles = host.extract_fields().await.unwrap();
        assert_eq!(handles.len(), 4);

        assert_eq!(host.classify(&handles[0]).await, Some(FieldType::Text));
        assert_eq!(
            host.classify(&handles[1]).await,
            Some(FieldType::MultipleChoice)
        );
        assert_eq!(host.classify(&handles[2]).await, None);
        assert_eq!(host.classify(&FieldHandle::new("missing")).await, None);
    }

    #[tokio::test]
    async fn test_extract_requires_options() {
        let host = host();
        let colour = host
            .extract(&FieldHandle::new("colour"), FieldType::MultipleChoice)
            .await
            .unwrap();
        assert_eq!(colour.options, vec!["Red", "Blue"]);

        assert!(matches!(
            host.extract(&FieldHandle::new("rate"), FieldType::LinearScale)
                .await,
            Err(FieldError::Extraction { .. })
        ));
        assert!(matches!(
            host.extract(&FieldHandle::new("nope"), FieldType::Text).await,
            Err(FieldError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_prefilled_and_fill() {
        let host = host();
        let name = host
            .extract(&FieldHandle::new("name"), FieldType::Text)
            .await
            .unwrap();
        let colour = host
            .extract(&FieldHandle::new("colour"), FieldType::MultipleChoice)
            .await
            .unwrap();

        assert!(host.is_already_answered(FieldType::Text, &name).await);
        assert!(
            !host
                .is_already_answered(FieldType::MultipleChoice, &colour)
                .await
        );

        host.mark_skipped(&name).await;
        let answer = AnswerPayload::SingleOption(OptionChoice::Listed("Blue".to_string()));
        assert!(
            host.fill(FieldType::MultipleChoice, &colour, &answer)
                .await
                .unwrap()
        );

        let output = host.output(None);
        assert_eq!(output.skipped, vec!["name"]);
        assert_eq!(output.answers.len(), 1);
        assert_eq!(output.answers[0].id, "colour");
        assert_eq!(output.answers[0].kind, "multiple_choice");
        assert_eq!(output.answers[0].value, answer);
    }
}
