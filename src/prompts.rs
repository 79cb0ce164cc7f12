//! ==============================================================================
//! prompts.rs - prompt templates for the ai endpoints
//! ==============================================================================
//!
//! purpose:
//!     turns resolved sensor values into the message list sent upstream.
//!     wording lives here as plain template data with `{name}` placeholders,
//!     so it can change without touching routing code.
//!
//! relationships:
//!     - used by: api.rs (builds a Prompt per request)
//!     - produces: messages + GenerationParams consumed by gateway.rs
//!
//! ==============================================================================

use serde::Serialize;

use crate::domain::{ChatTurn, SensorInput, SensorReading};
use crate::gateway::GenerationParams;
use crate::store::{resolve, NoSensorData};

/// most recent prior turns forwarded with a chat message
pub const MAX_HISTORY_TURNS: usize = 10;

// ==============================================================================
// template data
// ==============================================================================

const ANALYSIS_PERSONA: &str = "You are a GreenPulse expert consultant. \
Follow the answer format strictly. Be brief and to the point.";

const ANALYSIS_TEMPLATE: &str = "GreenPulse station data:
• Temperature: {temperature}°C (target 20–25°C)
• Humidity: {humidity}% (target 60–80%)
• Light: {light_intensity} lux (target 400–600)
• CO2: {co2_ppm} ppm (target 400–450)

Answer strictly in this format, each item on a new line, no extra words:

🟢 Status: [Optimal / Good / Needs attention]
📋 Summary: [1–2 sentences about the overall state of the system]
✅ In range: [comma-separated list of parameters]
⚠️ Deviations: [out-of-range parameters with their actual values, or \"all in range\"]
🔧 Action: [one concrete recommendation]";

pub const ANALYSIS_PARAMS: GenerationParams = GenerationParams { max_tokens: 180, temperature: 0.4 };

const PREDICTION_PERSONA: &str = "You are a GreenPulse bioreactor expert. \
Follow the format strictly. Numbers and facts only.";

const PREDICTION_TEMPLATE: &str = "GreenPulse station data:
• pH: {ph} (target 6.5–7.5)
• Temperature: {temperature}°C (target 20–25°C)
• Light: {light_intensity} lux (target 400–600)

Estimate CO2 absorption by the GreenPulse bioreactor (1 bench = up to 38 kg CO2/year).
Answer strictly in this format, each item on a new line:

⚡ Efficiency: [number]% ([1–2 words why])
⏱ Per hour: [number] g CO2
🌙 Per 24 hours: [number] g CO2
📅 Per month: [number] g CO2
🌍 Per year: [number] kg CO2
💡 How to improve: [one concrete action]";

pub const PREDICTION_PARAMS: GenerationParams = GenerationParams { max_tokens: 150, temperature: 0.3 };

const CONVERSATION_SYSTEM: &str = "You are the assistant for GreenPulse, an innovative system \
that cleans CO2 from the air using bioreactor benches.

📋 ABOUT GREENPULSE:
- A bioreactor bench for resting and for cleaning the air
- 1 bench removes 38 kg of CO2 per year (equivalent to 15 trees)
- Saves $1,900 per year per bench
- Serves 15,000 people within a 0.8 km zone
- Uses natural photosynthesis, no electricity or chemicals
- Operates at 92% efficiency
- Cost: $500-800 per unit
- Business models: B2G (schools, municipalities), B2B (corporate ESG), grants, biomass

🧬 ABOUT BALDYRIA:
- A microorganism that absorbs CO2 through photosynthesis
- Grows in the bioreactor at pH 6.5-7.5 and 20-25°C
- Needs light for intensive photosynthesis
- Growth rate depends on environmental conditions

📊 OPTIMAL CONDITIONS:
- Temperature: 20-25°C
- Humidity: 60-80%
- pH: 6.5-7.5
- Light: 400-600 lux
- CO2: 400-450 ppm

💡 ANSWER STYLE:
- Short and informative (2-3 sentences at a time)
- Use emoji for clarity
- Be a friendly consultant
- If you don't know, say so honestly and suggest an alternative
- Keep the context of previous messages in the dialogue";

pub const CONVERSATION_PARAMS: GenerationParams = GenerationParams { max_tokens: 500, temperature: 0.7 };

// ==============================================================================
// resolved parameter sets (echoed back to the client)
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisParameters {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light_intensity: Option<f64>,
    pub co2_ppm: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub satellites: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionConditions {
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub light_intensity: Option<f64>,
}

impl AnalysisParameters {
    pub fn resolve(
        o: &SensorInput,
        current: Option<&SensorReading>,
        fallback: Option<&SensorInput>,
    ) -> Result<Self, NoSensorData> {
        Ok(Self {
            temperature: resolve(o.temperature, current, fallback, |c| c.temperature, |f| f.temperature)?,
            humidity: resolve(o.humidity, current, fallback, |c| c.humidity, |f| f.humidity)?,
            light_intensity: resolve(o.light_intensity, current, fallback, |c| c.light_intensity, |f| f.light_intensity)?,
            co2_ppm: resolve(o.co2_ppm, current, fallback, |c| c.co2_ppm, |f| f.co2_ppm)?,
            // location is only echoed back, never required
            latitude: resolve(o.latitude, current, fallback, |c| c.latitude, |f| f.latitude).unwrap_or_default(),
            longitude: resolve(o.longitude, current, fallback, |c| c.longitude, |f| f.longitude).unwrap_or_default(),
            satellites: resolve(o.satellites, current, fallback, |c| c.satellites, |f| f.satellites).unwrap_or_default(),
        })
    }
}

impl PredictionConditions {
    pub fn resolve(
        o: &SensorInput,
        current: Option<&SensorReading>,
        fallback: Option<&SensorInput>,
    ) -> Result<Self, NoSensorData> {
        Ok(Self {
            ph: resolve(o.ph, current, fallback, |c| c.ph, |f| f.ph)?,
            temperature: resolve(o.temperature, current, fallback, |c| c.temperature, |f| f.temperature)?,
            light_intensity: resolve(o.light_intensity, current, fallback, |c| c.light_intensity, |f| f.light_intensity)?,
        })
    }
}

/// everything the gateway needs for one completion
#[derive(Debug, Clone)]
pub struct Prompt {
    pub messages: Vec<ChatTurn>,
    pub params: GenerationParams,
}

// ==============================================================================
// builders
// ==============================================================================

pub fn analysis_prompt(p: &AnalysisParameters) -> Prompt {
    let user = render(
        ANALYSIS_TEMPLATE,
        &[
            ("temperature", show(p.temperature)),
            ("humidity", show(p.humidity)),
            ("light_intensity", show(p.light_intensity)),
            ("co2_ppm", show(p.co2_ppm)),
        ],
    );
    Prompt {
        messages: vec![ChatTurn::system(ANALYSIS_PERSONA), ChatTurn::user(user)],
        params: ANALYSIS_PARAMS,
    }
}

pub fn prediction_prompt(c: &PredictionConditions) -> Prompt {
    let user = render(
        PREDICTION_TEMPLATE,
        &[
            ("ph", show(c.ph)),
            ("temperature", show(c.temperature)),
            ("light_intensity", show(c.light_intensity)),
        ],
    );
    Prompt {
        messages: vec![ChatTurn::system(PREDICTION_PERSONA), ChatTurn::user(user)],
        params: PREDICTION_PARAMS,
    }
}

/// system message, then at most the last `MAX_HISTORY_TURNS` prior turns,
/// then the new user message
pub fn conversation_prompt(message: &str, history: &[ChatTurn]) -> Prompt {
    let recent = &history[history.len().saturating_sub(MAX_HISTORY_TURNS)..];

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatTurn::system(CONVERSATION_SYSTEM));
    messages.extend_from_slice(recent);
    messages.push(ChatTurn::user(message));

    Prompt { messages, params: CONVERSATION_PARAMS }
}

/// substitute `{name}` placeholders
fn render(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |out, (name, value)| {
        out.replace(&format!("{{{}}}", name), value)
    })
}

fn show<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "n/a".to_string())
}
