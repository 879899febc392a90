//! Fixed instruction templates. Placeholders are `{name}` and are filled with
//! [`render`]; literal braces in the JSON examples are doubled.

/// Per-chunk summarisation.
pub const SUMMARIZE: &str = "Summarize this trading strategy ensuring that all relevant indicators mentioned are retained in summary: {context}";

pub const EXTRACT_SYSTEM: &str = r#"You are an expert algorithmic trader. You read descriptions and video transcripts of trading strategies and extract precise, structured trading rules from them. You never invent indicators or rules that are not supported by the text."#;

pub const EXTRACT_USER: &str = r#"Extract the trading strategy described in the text between <STRATEGY> and </STRATEGY>.

Respond with ONLY valid JSON (no markdown, no explanations) in exactly this shape, using lower-case keys:
{{
  "indicators": {{
    "<lower-case indicator id, e.g. rsi>": {{
      "name": "Relative Strength Index",
      "function": "what the indicator measures and how the strategy uses it",
      "parameters": {{ "period": 14 }}
    }}
  }},
  "conditions": {{
    "entry": ["natural-language entry rule", "..."],
    "exit": ["natural-language exit rule", "..."]
  }},
  "notes": ["risk management, timeframes, or anything else relevant"]
}}

Use standard default parameters when the text names an indicator without giving them.

<STRATEGY>
{strategy_desc}
</STRATEGY>"#;

pub const CODEGEN_SYSTEM: &str = r#"You are an expert algorithmic trader and software engineer specializing in developing robust, production-ready trading strategies.
You have deep knowledge in technical analysis, risk management, and structured data extraction.
When generating code, use clear, modular, and well-commented Python that leverages relevant libraries (e.g., Pandas, NumPy, TA-Lib)
and best practices for error handling and testing.
Ensure your solutions extract structured trading signals from market data and implement strategy logic efficiently."#;

pub const CODEGEN_USER: &str = r#"Given the following trading strategy description:

{strategy_desc}

Please generate two Python functions:

1. **`calculate_indicators(df: pd.DataFrame) -> pd.DataFrame`**
   - Takes a Pandas DataFrame (`df`) of market data with columns: `Close`, `High`, `Low`, `Volume`, `timestamp`.
   - Computes **technical indicators** relevant to the strategy, such as moving averages, RSI, MACD, and others as needed.
   - Returns the updated DataFrame with these computed indicators.

2. **`generate_trading_signal(df: pd.DataFrame) -> dict`**
   - Takes the updated `df` (with computed indicators) and generates a trading signal.
   - Determines the **trend** based on moving average crossovers.
   - Uses **MACD & RSI** for confirmation before deciding to `BUY`, `SELL`, or `HOLD`.
   - Returns a structured alert as **valid JSON**, following this exact format:
     ```json
     {{
         "Trend": "Uptrend" | "Downtrend" | "Sideways",
         "RSI": float,
         "MACD": "Bullish" | "Bearish",
         "Volume": int,
         "Timestamp": str,
         "ACTION": "BUY" | "SELL" | "HOLD"
     }}
     ```

**Additional Requirements:**
- Use Python best practices with Pandas and `ta` library.
- Ensure efficient calculations and error handling.
- Functions should be modular and production-ready.

Return the code ONLY, no explanations."#;

/// Substitute `{key}` placeholders and collapse `{{`/`}}` to single braces in
/// one pass over the template. Interpolated values are never rescanned.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '}']) {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(stripped) = tail.strip_prefix("{{") {
            out.push('{');
            rest = stripped;
        } else if let Some(stripped) = tail.strip_prefix("}}") {
            out.push('}');
            rest = stripped;
        } else if let Some((value, after)) = placeholder(tail, vars) {
            out.push_str(value);
            rest = after;
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

fn placeholder<'t, 'v>(tail: &'t str, vars: &[(&str, &'v str)]) -> Option<(&'v str, &'t str)> {
    let body = tail.strip_prefix('{')?;
    let end = body.find('}')?;
    let key = &body[..end];
    let value = vars.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)?;
    Some((value, &body[end + 1..]))
}
