// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MCP Protocol Schema Definitions
//!
//! This module contains type-safe definitions for all MCP protocol messages,
//! capabilities, and tool schemas. This ensures protocol compliance and makes
//! it easy to modify the schema without hardcoding JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server Information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP Tool Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// JSON Schema Property Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Element schema for array properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

/// MCP Server Capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: Vec<ToolSchema>,
}

/// Complete MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}

impl InitializeResponse {
    /// Create a new initialize response with current server configuration
    pub fn new(protocol_version: String, server_name: String, server_version: String) -> Self {
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: server_name,
                version: server_version,
            },
            capabilities: ServerCapabilities {
                tools: get_tools(),
            },
        }
    }
}

/// All insight tool schemas, in the order they are advertised
pub fn get_tools() -> Vec<ToolSchema> {
    vec![
        create_get_period_summary_tool(),
        create_get_trends_tool(),
        create_detect_anomalies_tool(),
        create_get_readiness_breakdown_tool(),
        create_get_data_completeness_tool(),
        create_get_hydration_guidance_tool(),
        create_get_coach_cues_tool(),
    ]
}

/// Create the get_period_summary tool schema
fn create_get_period_summary_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("period".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Period granularity: 'daily', 'weekly', or 'monthly'".to_string()),
        items: None,
    });

    properties.insert("anchor_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Date (YYYY-MM-DD) or phrase like 'last week' the period is anchored to; defaults to today".to_string()),
        items: None,
    });

    properties.insert("include_activities".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include the activity list (default true)".to_string()),
        items: None,
    });

    properties.insert("include_sleep".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include per-day sleep data (default true)".to_string()),
        items: None,
    });

    properties.insert("include_stress".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include per-day stress data (default true)".to_string()),
        items: None,
    });

    properties.insert("include_body_battery".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include per-day body battery data (default true)".to_string()),
        items: None,
    });

    properties.insert("include_training_readiness".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include per-day training readiness scores (default true)".to_string()),
        items: None,
    });

    properties.insert("include_hrv".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include per-day HRV data (default false)".to_string()),
        items: None,
    });

    properties.insert("include_stats".to_string(), PropertySchema {
        property_type: "boolean".to_string(),
        description: Some("Include aggregate statistics over the period (default true)".to_string()),
        items: None,
    });

    properties.insert("activity_type".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Case-insensitive substring filter on activity type; empty matches all".to_string()),
        items: None,
    });

    ToolSchema {
        name: "get_period_summary".to_string(),
        description: "Summarize wellness signals and activities for a day, week, or month".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["period".to_string()]),
        },
    }
}

/// Create the get_trends tool schema
fn create_get_trends_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("start_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Start date (YYYY-MM-DD) or relative phrase like 'last 30 days'".to_string()),
        items: None,
    });

    properties.insert("end_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("End date (YYYY-MM-DD); omit when start_date is a phrase covering the whole range".to_string()),
        items: None,
    });

    properties.insert("include".to_string(), PropertySchema {
        property_type: "array".to_string(),
        description: Some("Metric keys to compute: rhr, hrv, sleep, steps, body_battery, stress (default: all except stress)".to_string()),
        items: Some(Box::new(PropertySchema {
            property_type: "string".to_string(),
            description: None,
            items: None,
        })),
    });

    ToolSchema {
        name: "get_trends".to_string(),
        description: "Compute rolling averages and start-to-end deltas for wellness metrics over a date range".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["start_date".to_string()]),
        },
    }
}

/// Create the detect_anomalies tool schema
fn create_detect_anomalies_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("start_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Start date (YYYY-MM-DD) or relative phrase".to_string()),
        items: None,
    });

    properties.insert("end_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("End date (YYYY-MM-DD)".to_string()),
        items: None,
    });

    properties.insert("rhr_bpm_increase".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("Resting heart rate increase over baseline that flags, in bpm (default 5)".to_string()),
        items: None,
    });

    properties.insert("hrv_ms_drop".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("HRV drop below baseline that flags, in ms (default 15)".to_string()),
        items: None,
    });

    properties.insert("sleep_hours_min".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("Absolute sleep floor in hours (default 6.0)".to_string()),
        items: None,
    });

    properties.insert("steps_drop_pct".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("Step count drop against baseline that flags, in percent (default 30)".to_string()),
        items: None,
    });

    ToolSchema {
        name: "detect_anomalies".to_string(),
        description: "Flag unusual recent wellness readings against the account's own baseline".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["start_date".to_string()]),
        },
    }
}

/// Create the get_readiness_breakdown tool schema
fn create_get_readiness_breakdown_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Date (YYYY-MM-DD) or phrase resolving to a single day, e.g. 'yesterday'".to_string()),
        items: None,
    });

    ToolSchema {
        name: "get_readiness_breakdown".to_string(),
        description: "Break down the training readiness score for a single day into its components".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["date".to_string()]),
        },
    }
}

/// Create the get_data_completeness tool schema
fn create_get_data_completeness_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("start_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Start date (YYYY-MM-DD) or relative phrase".to_string()),
        items: None,
    });

    properties.insert("end_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("End date (YYYY-MM-DD)".to_string()),
        items: None,
    });

    ToolSchema {
        name: "get_data_completeness".to_string(),
        description: "Report which expected wellness signals are present per day over a range".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["start_date".to_string()]),
        },
    }
}

/// Create the get_hydration_guidance tool schema
fn create_get_hydration_guidance_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("weight_kg".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("Body weight in kilograms; must be positive".to_string()),
        items: None,
    });

    properties.insert("training_minutes".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("Planned training duration in minutes (default 0)".to_string()),
        items: None,
    });

    properties.insert("temperature_c".to_string(), PropertySchema {
        property_type: "number".to_string(),
        description: Some("Expected ambient temperature in Celsius; omit when unknown".to_string()),
        items: None,
    });

    ToolSchema {
        name: "get_hydration_guidance".to_string(),
        description: "Estimate a daily fluid intake target from body weight, training load, and temperature".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["weight_kg".to_string()]),
        },
    }
}

/// Create the get_coach_cues tool schema
fn create_get_coach_cues_tool() -> ToolSchema {
    let mut properties = HashMap::new();

    properties.insert("period".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Period granularity: 'daily', 'weekly', or 'monthly'".to_string()),
        items: None,
    });

    properties.insert("anchor_date".to_string(), PropertySchema {
        property_type: "string".to_string(),
        description: Some("Date (YYYY-MM-DD) or phrase the period is anchored to; defaults to today".to_string()),
        items: None,
    });

    ToolSchema {
        name: "get_coach_cues".to_string(),
        description: "Generate short coaching cues from the period's signals and any active anomalies".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["period".to_string()]),
        },
    }
}
