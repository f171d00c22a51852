use super::format::ZERO_WIDTH_SPACE;

pub const DEFAULT_MAX_SIZE: usize = 1990;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error(
    "string of {size} characters is outside the maximum size of {max_size} (including prefix and suffix)"
)]
pub struct PageOverflow {
    pub size: usize,
    pub max_size: usize,
}

/// Splits text into pages that fit in a single Discord message.
///
/// Every page is wrapped in `prefix` and `suffix`, and sizes are measured in characters.
#[derive(Debug, Clone)]
pub struct Paginator {
    pages: Vec<String>,
    current: String,
    prefix: String,
    suffix: String,
    max_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, None, None)
    }
}

impl Paginator {
    pub fn new(max_size: usize, prefix: Option<&str>, suffix: Option<&str>) -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            prefix: prefix.unwrap_or_default().to_string(),
            suffix: suffix.unwrap_or_default().to_string(),
            max_size,
        }
    }

    /// Paginator whose pages are fenced code blocks in `language`.
    pub fn code_block(max_size: usize, language: &str) -> Self {
        Self::new(max_size, Some(&format!("```{}\n", language)), Some("```"))
    }

    fn wrapped_len(&self, body: &str) -> usize {
        let body_len = if body.is_empty() {
            ZERO_WIDTH_SPACE.chars().count()
        } else {
            body.chars().count()
        };
        self.prefix.chars().count() + body_len + self.suffix.chars().count()
    }

    fn wrap(&self, body: &str) -> String {
        let body = if body.is_empty() { ZERO_WIDTH_SPACE } else { body };
        format!("{}{}{}", self.prefix, body, self.suffix)
    }

    pub fn append(&mut self, value: &str) -> Result<(), PageOverflow> {
        let size = self.wrapped_len(value);
        if size > self.max_size {
            return Err(PageOverflow {
                size,
                max_size: self.max_size,
            });
        }

        let combined = self.current.chars().count() + value.chars().count();
        let combined_size = self.prefix.chars().count() + combined + self.suffix.chars().count();
        if combined_size > self.max_size {
            self.next_page();
        }

        self.current.push_str(value);
        Ok(())
    }

    pub fn append_line(&mut self, value: &str) -> Result<(), PageOverflow> {
        self.append(&format!("{}\n", value))
    }

    /// Closes the current page, even when it is empty.
    pub fn next_page(&mut self) {
        let page = self.wrap(&self.current);
        self.pages.push(page);
        self.current.clear();
    }

    pub fn pages(&self) -> Vec<String> {
        let mut pages = self.pages.clone();
        if !self.current.is_empty() {
            pages.push(self.wrap(&self.current));
        }
        pages
    }
}

/// Which page a reactive paginator shows, and which of its buttons are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    index: usize,
    len: usize,
}

impl PageState {
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len: len.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn first(&mut self) {
        self.index = 0;
    }

    pub fn last(&mut self) {
        self.index = self.len - 1;
    }

    /// Moves by `step` pages, wrapping around either end.
    pub fn rotate(&mut self, step: isize) {
        let len = self.len as isize;
        self.index = (self.index as isize + step).rem_euclid(len) as usize;
    }

    pub fn at_start(&self) -> bool {
        self.index == 0
    }

    pub fn at_end(&self) -> bool {
        self.index == self.len - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_lines_into_one_page() {
        let mut pg = Paginator::default();
        pg.append_line("a").unwrap();
        pg.append_line("b").unwrap();
        assert_eq!(pg.pages(), vec!["a\nb\n".to_string()]);
    }

    #[test]
    fn starts_new_page_on_overflow() {
        let mut pg = Paginator::new(10, Some("["), Some("]"));
        pg.append("12345").unwrap();
        pg.append("678").unwrap();
        // 1 + 9 + 1 = 11 > 10
        pg.append("x").unwrap();
        assert_eq!(pg.pages(), vec!["[12345678]".to_string(), "[x]".to_string()]);
    }

    #[test]
    fn rejects_values_that_never_fit() {
        let mut pg = Paginator::new(10, Some("```"), Some("```"));
        let err = pg.append("12345").unwrap_err();
        assert_eq!(err, PageOverflow { size: 11, max_size: 10 });
        assert!(pg.pages().is_empty());
    }

    #[test]
    fn empty_page_renders_zero_width_space() {
        let mut pg = Paginator::new(20, Some("<"), Some(">"));
        pg.next_page();
        assert_eq!(pg.pages(), vec![format!("<{}>", ZERO_WIDTH_SPACE)]);
    }

    #[test]
    fn counts_characters() {
        let mut pg = Paginator::new(3, None, None);
        pg.append("ééé").unwrap();
        pg.append("é").unwrap();
        assert_eq!(pg.pages().len(), 2);
    }

    #[test]
    fn page_state_wraps_around() {
        let mut state = PageState::new(3);
        assert!(state.at_start());
        state.rotate(-1);
        assert_eq!(state.index(), 2);
        assert!(state.at_end());
        state.rotate(1);
        assert_eq!(state.index(), 0);
        state.last();
        assert_eq!(state.index(), 2);
        state.first();
        assert_eq!(state.index(), 0);
    }

    #[test]
    fn single_page_is_both_start_and_end() {
        let state = PageState::new(1);
        assert!(state.at_start() && state.at_end());
        assert!(PageState::new(0).at_end());
    }
}
