//! Parsing of computed CSS background values.
//!
//! Only the first background layer is considered. Anything unparseable
//! falls back to the property's initial value.

/// `percent` of a basis plus a fixed pixel offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
    pub percent: f64,
    pub px: f64,
}

impl Length {
    pub const fn percent(percent: f64) -> Self {
        Self { percent, px: 0.0 }
    }

    pub const fn px(px: f64) -> Self {
        Self { percent: 0.0, px }
    }

    pub fn resolve(&self, basis: f64) -> f64 {
        basis * self.percent / 100.0 + self.px
    }

    fn negate(self) -> Self {
        Self {
            percent: -self.percent,
            px: -self.px,
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            percent: self.percent + other.percent,
            px: self.px + other.px,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    #[default]
    Scroll,
    Fixed,
}

impl Attachment {
    pub fn parse(value: &str) -> Self {
        match first_layer(value).trim() {
            "fixed" => Attachment::Fixed,
            _ => Attachment::Scroll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeComponent {
    Auto,
    Length(Length),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundSize {
    Cover,
    Contain,
    Explicit(SizeComponent, SizeComponent),
}

impl Default for BackgroundSize {
    fn default() -> Self {
        BackgroundSize::Explicit(SizeComponent::Auto, SizeComponent::Auto)
    }
}

impl BackgroundSize {
    pub fn parse(value: &str) -> Self {
        let tokens = tokenize(first_layer(value));
        let component = |token: &str| match token {
            "auto" => Some(SizeComponent::Auto),
            other => parse_length(other).map(SizeComponent::Length),
        };
        match tokens.as_slice() {
            ["cover"] => BackgroundSize::Cover,
            ["contain"] => BackgroundSize::Contain,
            [w] => match component(w) {
                Some(w) => BackgroundSize::Explicit(w, SizeComponent::Auto),
                None => BackgroundSize::default(),
            },
            [w, h] => match (component(w), component(h)) {
                (Some(w), Some(h)) => BackgroundSize::Explicit(w, h),
                _ => BackgroundSize::default(),
            },
            _ => BackgroundSize::default(),
        }
    }
}

/// Offsets are resolved against `container - background` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackgroundPosition {
    pub x: Length,
    pub y: Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl Keyword {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "left" => Some(Keyword::Left),
            "right" => Some(Keyword::Right),
            "top" => Some(Keyword::Top),
            "bottom" => Some(Keyword::Bottom),
            "center" => Some(Keyword::Center),
            _ => None,
        }
    }

    fn is_vertical(self) -> bool {
        matches!(self, Keyword::Top | Keyword::Bottom)
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Keyword::Left | Keyword::Right)
    }

    fn to_length(self) -> Length {
        match self {
            Keyword::Left | Keyword::Top => Length::percent(0.0),
            Keyword::Right | Keyword::Bottom => Length::percent(100.0),
            Keyword::Center => Length::percent(50.0),
        }
    }

    /// `right 10px` is `100% - 10px`.
    fn with_offset(self, offset: Length) -> Length {
        match self {
            Keyword::Left | Keyword::Top | Keyword::Center => offset,
            Keyword::Right | Keyword::Bottom => Length::percent(100.0).add(offset.negate()),
        }
    }
}

impl BackgroundPosition {
    pub fn parse(value: &str) -> Self {
        let tokens = tokenize(first_layer(value));
        let parsed = match tokens.as_slice() {
            [one] => Self::parse_one(one),
            [a, b] => Self::parse_two(a, b),
            [_, _, _] | [_, _, _, _] => Self::parse_edges(&tokens),
            _ => None,
        };
        parsed.unwrap_or_default()
    }

    fn parse_one(token: &str) -> Option<Self> {
        let center = Length::percent(50.0);
        Some(match Keyword::parse(token) {
            Some(k) if k.is_vertical() => Self {
                x: center,
                y: k.to_length(),
            },
            Some(k) => Self {
                x: k.to_length(),
                y: center,
            },
            None => Self {
                x: parse_length(token)?,
                y: center,
            },
        })
    }

    fn parse_two(a: &str, b: &str) -> Option<Self> {
        let (ka, kb) = (Keyword::parse(a), Keyword::parse(b));
        let swapped = ka.is_some_and(Keyword::is_vertical) || kb.is_some_and(Keyword::is_horizontal);
        let (h, v) = if swapped { (b, a) } else { (a, b) };
        let axis = |token: &str, vertical: bool| match Keyword::parse(token) {
            Some(k) if (vertical && k.is_horizontal()) || (!vertical && k.is_vertical()) => None,
            Some(k) => Some(k.to_length()),
            None => parse_length(token),
        };
        Some(Self {
            x: axis(h, false)?,
            y: axis(v, true)?,
        })
    }

    /// Three- and four-value syntax: `right 10px bottom`, `left 5% top 2px`.
    fn parse_edges(tokens: &[&str]) -> Option<Self> {
        let mut groups: Vec<(Keyword, Option<Length>)> = Vec::new();
        for token in tokens {
            match Keyword::parse(token) {
                Some(k) => groups.push((k, None)),
                None => {
                    let offset = parse_length(token)?;
                    let last = groups.last_mut()?;
                    if last.1.is_some() || last.0 == Keyword::Center {
                        return None;
                    }
                    last.1 = Some(offset);
                }
            }
        }
        if groups.len() != 2 {
            return None;
        }
        let mut x = None;
        let mut y = None;
        for (keyword, offset) in &groups {
            let length = match offset {
                Some(off) => keyword.with_offset(*off),
                None => keyword.to_length(),
            };
            let slot = if keyword.is_horizontal() {
                &mut x
            } else if keyword.is_vertical() {
                &mut y
            } else if x.is_none() && !groups.iter().any(|(k, _)| k.is_horizontal()) {
                &mut x
            } else {
                &mut y
            };
            if slot.replace(length).is_some() {
                return None;
            }
        }
        Some(Self { x: x?, y: y? })
    }
}

/// The background rules the coordinate mapper consumes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackgroundRules {
    pub size: BackgroundSize,
    pub position: BackgroundPosition,
    pub attachment: Attachment,
}

impl BackgroundRules {
    pub fn parse(size: &str, position: &str, attachment: &str) -> Self {
        Self {
            size: BackgroundSize::parse(size),
            position: BackgroundPosition::parse(position),
            attachment: Attachment::parse(attachment),
        }
    }
}

/// Pulls the address out of the first `url(...)` in a `background-image`.
pub fn extract_url(image: &str) -> Option<String> {
    let start = image.find("url(")? + 4;
    let rest = image[start..].trim_start();
    let url = match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            &inner[..inner.find(quote)?]
        }
        _ => rest[..rest.find(')')?].trim(),
    };
    (!url.is_empty()).then(|| url.to_string())
}

pub fn is_data_uri(url: &str) -> bool {
    url.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

fn first_layer(value: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return &value[..i],
            _ => {}
        }
    }
    value
}

/// Splits on whitespace outside parentheses.
fn tokenize(value: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&value[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

/// `12px`, `12`, `40%`, or `calc(100% - 10px)`.
fn parse_length(token: &str) -> Option<Length> {
    if let Some(inner) = token.strip_prefix("calc(").and_then(|t| t.strip_suffix(')')) {
        return parse_calc(inner);
    }
    if let Some(number) = token.strip_suffix('%') {
        return number.trim().parse::<f64>().ok().filter(|v| v.is_finite()).map(Length::percent);
    }
    leading_number(token).map(Length::px)
}

fn parse_calc(expr: &str) -> Option<Length> {
    let mut total = Length::default();
    let mut negate = false;
    let mut expect_term = true;
    for token in tokenize(expr) {
        if expect_term {
            let term = parse_length(token)?;
            total = total.add(if negate { term.negate() } else { term });
            expect_term = false;
        } else {
            negate = match token {
                "+" => false,
                "-" => true,
                _ => return None,
            };
            expect_term = true;
        }
    }
    (!expect_term).then_some(total)
}

/// Longest numeric prefix, like `parseFloat`.
fn leading_number(token: &str) -> Option<f64> {
    let end = token
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(token.len(), |(i, _)| i);
    token[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
