use catalog::{CountryKind, CountryRecord};

/// Actions a popup offers; the host forwards clicks to
/// [`crate::Explorer::on_popup_action`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PopupAction {
    ViewProfile,
}

impl PopupAction {
    pub fn label(&self) -> &'static str {
        match self {
            PopupAction::ViewProfile => "View profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupField {
    pub label: &'static str,
    pub value: String,
}

/// Structured popup body bound to one marker.
///
/// The rendering backend decides how to lay this out; the engine only
/// supplies data and the list of actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub country_id: String,
    pub title: String,
    pub flag: String,
    pub fields: Vec<PopupField>,
    pub actions: Vec<PopupAction>,
}

impl PopupContent {
    pub fn for_record(record: &CountryRecord) -> Self {
        let mut fields = vec![
            PopupField {
                label: "Capital",
                value: record.capital.clone(),
            },
            PopupField {
                label: "Region",
                value: record.region.to_string(),
            },
        ];
        let status = match record.kind {
            CountryKind::Sovereign => None,
            CountryKind::Territory => Some("Territory"),
            CountryKind::DeFacto => Some("De facto state"),
        };
        if let Some(status) = status {
            fields.push(PopupField {
                label: "Status",
                value: status.to_string(),
            });
        }

        Self {
            country_id: record.id.clone(),
            title: record.name.clone(),
            flag: record.flag.clone(),
            fields,
            actions: vec![PopupAction::ViewProfile],
        }
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}
