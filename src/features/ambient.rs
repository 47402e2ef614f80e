// Ambient event generation
// Builds the prompt from channel context, then cleans the model output
// into a short message that fits the budget.

use chrono::{DateTime, TimeZone, Timelike};
use rand::Rng;

use crate::api::llm::{CompletionRequest, GenerationError, TextGenerator};
use crate::models::channel::{ChannelConfig, DangerLevel};
use crate::utils::config::MESSAGE_BUDGET;
use crate::utils::formatters::collapse_whitespace;

const ELLIPSIS: char = '…';

/// Sentence and word boundaries before this index are never used for a cut
const MIN_CUT_INDEX: usize = 80;

const TEMPERATURE: f32 = 0.9;
const MAX_TOKENS: u32 = 120;

const STYLE_DIRECTIVE: &str = "You write ambient events for a text roleplay setting. \
Describe one small thing happening in the scene right now, as if glimpsed by a passer-by. \
Write in present tense and third person. No modern references, no dialogue, no named player characters. \
One or two sentences, aim for under 150 characters and never exceed 200. \
Reply with the event text only.";

/// Coarse time of day, from the local wall-clock hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Dawn,
    Daylight,
    Dusk,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=8 => TimeOfDay::Dawn,
            9..=16 => TimeOfDay::Daylight,
            17..=20 => TimeOfDay::Dusk,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Daylight => "daylight",
            TimeOfDay::Dusk => "dusk",
            TimeOfDay::Night => "night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Subtle,
    Ominous,
}

impl Tone {
    /// Draw a tone; danger raises the odds of an ominous event
    pub fn draw<R: Rng + ?Sized>(danger: DangerLevel, rng: &mut R) -> Self {
        if rng.random_bool(danger.ominous_chance()) {
            Tone::Ominous
        } else {
            Tone::Subtle
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Tone::Subtle => "subtle: quiet, everyday atmosphere with no threat",
            Tone::Ominous => "ominous: a faint sign that something is wrong, without open violence",
        }
    }
}

/// Everything the prompt needs to know about a channel
#[derive(Debug, Clone)]
pub struct AmbientContext {
    pub location: String,
    pub lore: String,
    pub criteria: String,
    pub channel_name: String,
    pub danger: DangerLevel,
}

impl AmbientContext {
    pub fn from_config(config: &ChannelConfig, channel_name: &str) -> Self {
        Self {
            location: config.location.clone(),
            lore: config.lore.clone(),
            criteria: config.criteria.clone(),
            channel_name: channel_name.to_string(),
            danger: config.danger,
        }
    }
}

pub fn build_prompt(ctx: &AmbientContext, time_of_day: TimeOfDay, tone: Tone) -> CompletionRequest {
    let location = if ctx.location.trim().is_empty() {
        ctx.channel_name.as_str()
    } else {
        ctx.location.as_str()
    };

    let mut user = format!(
        "Location: {}\nChannel: #{}\nTime of day: {}\nDanger level: {}\nTone: {}",
        location,
        ctx.channel_name,
        time_of_day.as_str(),
        ctx.danger.as_str(),
        tone.instruction(),
    );
    if !ctx.lore.trim().is_empty() {
        user.push_str(&format!("\nBackground: {}", ctx.lore.trim()));
    }
    if !ctx.criteria.trim().is_empty() {
        user.push_str(&format!("\nExtra rules: {}", ctx.criteria.trim()));
    }

    CompletionRequest {
        system: STYLE_DIRECTIVE.to_string(),
        user,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Generate one ambient message for the given context at time `now`
pub async fn generate_ambient<Tz: TimeZone>(
    generator: &dyn TextGenerator,
    ctx: &AmbientContext,
    now: &DateTime<Tz>,
) -> Result<String, GenerationError> {
    let time_of_day = TimeOfDay::from_hour(now.hour());
    let tone = Tone::draw(ctx.danger, &mut rand::rng());
    let request = build_prompt(ctx, time_of_day, tone);

    let raw = generator.complete(&request).await?;
    let text = trim_to_length(strip_wrapping_quotes(&raw), MESSAGE_BUDGET);
    if text.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(text)
}

/// Models like to wrap the whole reply in quotes
fn strip_wrapping_quotes(s: &str) -> &str {
    let t = s.trim();
    for (open, close) in [('"', '"'), ('“', '”'), ('\'', '\'')] {
        if t.chars().count() >= 2 && t.starts_with(open) && t.ends_with(close) {
            let inner = &t[open.len_utf8()..t.len() - close.len_utf8()];
            if !inner.contains(open) && !inner.contains(close) {
                return inner.trim();
            }
        }
    }
    t
}

/// Fit `text` into `budget` characters, preferring sentence then word boundaries
pub fn trim_to_length(text: &str, budget: usize) -> String {
    let collapsed = collapse_whitespace(text);
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() <= budget {
        return collapsed;
    }
    if budget == 0 {
        return String::new();
    }

    let cut = &chars[..budget];

    if let Some(i) = cut.iter().rposition(|c| matches!(c, '.' | '!' | '?')) {
        if i >= MIN_CUT_INDEX {
            return cut[..=i].iter().collect();
        }
    }

    if let Some(i) = cut.iter().rposition(|c| *c == ' ') {
        if i >= MIN_CUT_INDEX {
            let mut out: String = cut[..i].iter().collect();
            out.push(ELLIPSIS);
            return out;
        }
    }

    // Leave room for the ellipsis
    let mut out: String = cut[..budget - 1].iter().collect();
    out.push(ELLIPSIS);
    out
}
