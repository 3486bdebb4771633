use super::ToolHandler;
use crate::error::{AssistantError, Result};
use crate::remote::FunctionDeclaration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;

/// Pages the host app can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Page {
    Home,
    Assistant,
    SocialBuzz,
    History,
    Marketplace,
    ChatRooms,
    Settings,
    Events,
    LocalServices,
}

impl Page {
    pub const ALL: [Page; 9] = [
        Page::Home,
        Page::Assistant,
        Page::SocialBuzz,
        Page::History,
        Page::Marketplace,
        Page::ChatRooms,
        Page::Settings,
        Page::Events,
        Page::LocalServices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Assistant => "assistant",
            Page::SocialBuzz => "socialBuzz",
            Page::History => "history",
            Page::Marketplace => "marketplace",
            Page::ChatRooms => "chatRooms",
            Page::Settings => "settings",
            Page::Events => "events",
            Page::LocalServices => "localServices",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        Page::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AssistantError::Tool(format!("unknown page '{}'", s)))
    }
}

/// Host-side navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, page: Page) -> Result<()>;
}

/// Navigator for headless hosts: remembers the last requested page
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    last: Mutex<Option<Page>>,
}

impl RecordingNavigator {
    pub fn last_page(&self) -> Option<Page> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, page: Page) -> Result<()> {
        info!("Navigating host to {}", page);
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(page);
        Ok(())
    }
}

/// `navigateToPage`: one string argument, `page`
pub struct NavigateTool {
    navigator: std::sync::Arc<dyn Navigator>,
}

impl NavigateTool {
    pub fn new(navigator: std::sync::Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }
}

fn page_arg(args: &Value) -> &str {
    args.get("page").and_then(Value::as_str).unwrap_or_default()
}

impl ToolHandler for NavigateTool {
    fn name(&self) -> &str {
        "navigateToPage"
    }

    fn declaration(&self) -> FunctionDeclaration {
        let pages: Vec<&str> = Page::ALL
            .iter()
            .filter(|p| **p != Page::Assistant)
            .map(|p| p.as_str())
            .collect();
        FunctionDeclaration {
            name: self.name().to_string(),
            description: "Navigates the user to a specific page within the My Alex app.".to_string(),
            parameters: serde_json::json!({
                "type": "OBJECT",
                "properties": {
                    "page": {
                        "type": "STRING",
                        "description": format!("The page to navigate to. Must be one of: {}.", pages.join(", ")),
                    }
                },
                "required": ["page"],
            }),
        }
    }

    fn activity(&self, args: &Value) -> String {
        format!("Navigating to {}...", page_arg(args))
    }

    fn call(&self, args: &Value) -> Result<Value> {
        let page: Page = page_arg(args).parse()?;
        self.navigator.navigate(page)?;
        Ok(Value::String(format!("Navigating to {}.", page)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn parses_page_identifiers() {
        assert_eq!("chatRooms".parse::<Page>().unwrap(), Page::ChatRooms);
        assert_eq!("EVENTS".parse::<Page>().unwrap(), Page::Events);
        assert!("moon".parse::<Page>().is_err());
    }

    #[test]
    fn navigates_and_confirms() {
        let navigator = Arc::new(RecordingNavigator::default());
        let tool = NavigateTool::new(navigator.clone());
        let args = serde_json::json!({ "page": "marketplace" });

        assert_eq!(tool.activity(&args), "Navigating to marketplace...");
        assert_eq!(
            tool.call(&args).unwrap(),
            Value::String("Navigating to marketplace.".into())
        );
        assert_eq!(navigator.last_page(), Some(Page::Marketplace));
    }

    #[test]
    fn invalid_page_is_a_tool_error() {
        let navigator = Arc::new(RecordingNavigator::default());
        let tool = NavigateTool::new(navigator.clone());
        let err = tool.call(&serde_json::json!({ "page": "nowhere" })).unwrap_err();
        assert!(matches!(err, AssistantError::Tool(_)));
        assert_eq!(navigator.last_page(), None);
    }
}
