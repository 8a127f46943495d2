//! Platform-neutral embed description.
//!
//! Formatting code builds an [`Embed`] so it can be asserted on in tests;
//! the Discord layer converts it into a serenity `CreateEmbed` at the edge.

use serenity::all::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, Timestamp};

pub const COLOR_ONLINE: u32 = 0x57f287;
pub const COLOR_OFFLINE: u32 = 0xeb4034;
pub const COLOR_INFO: u32 = 0x5865f2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

/// A rich message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub author: Option<EmbedAuthor>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    /// Stamp the embed with the time it is sent.
    pub timestamp: bool,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn timestamped(mut self) -> Self {
        self.timestamp = true;
        self
    }

    /// Look up a field value by name.
    #[cfg(test)]
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

impl From<&Embed> for CreateEmbed {
    fn from(embed: &Embed) -> Self {
        let mut out = CreateEmbed::new();
        if let Some(title) = &embed.title {
            out = out.title(title);
        }
        if let Some(description) = &embed.description {
            out = out.description(description);
        }
        if let Some(color) = embed.color {
            out = out.colour(color);
        }
        if let Some(author) = &embed.author {
            let mut builder = CreateEmbedAuthor::new(&author.name);
            if let Some(url) = &author.icon_url {
                builder = builder.icon_url(url);
            }
            out = out.author(builder);
        }
        for field in &embed.fields {
            out = out.field(&field.name, &field.value, field.inline);
        }
        if let Some(footer) = &embed.footer {
            out = out.footer(CreateEmbedFooter::new(footer));
        }
        if embed.timestamp {
            out = out.timestamp(Timestamp::now());
        }
        out
    }
}
