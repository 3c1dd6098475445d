use serde_json::Value;

/// One logical query against one domain server.
#[derive(Clone, Debug)]
pub struct QueryRequest {
    pub query: String,
    pub cursor: Option<String>,
    pub auto_paginate: bool,
    pub is_write: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            cursor: None,
            auto_paginate: true,
            is_write: false,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor.filter(|c| !c.is_empty());
        self
    }

    pub fn auto_paginate(mut self, enabled: bool) -> Self {
        self.auto_paginate = enabled;
        self
    }

    pub fn write(mut self) -> Self {
        self.is_write = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolMethod {
    Get(Vec<(String, String)>),
    Post(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub method: ToolMethod,
}

impl ToolCall {
    pub fn get(tool: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            tool: tool.into(),
            method: ToolMethod::Get(params),
        }
    }

    pub fn post(tool: impl Into<String>, body: Value) -> Self {
        Self {
            tool: tool.into(),
            method: ToolMethod::Post(body),
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self.method, ToolMethod::Post(_))
    }
}

/// Relayed tool answer: upstream status and its JSON body, untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolResponse {
    pub status: u16,
    pub body: Value,
}
