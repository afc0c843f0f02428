use indicatif::ProgressBar;

/// Observer for download progress, ticked from the streaming read loop.
///
/// One `advance` is emitted each time the integer download percentage
/// changes, so a full download produces roughly one hundred ticks.
pub trait ProgressSink {
    fn advance(&mut self);
    fn finish(&mut self);
}

/// Converts running byte counts into percent-change ticks on a sink.
///
/// State is local to a single download; a fresh ticker is built per call.
pub struct PercentTicker<S: ProgressSink> {
    sink: S,
    last_percent: u64,
}

impl<S: ProgressSink> PercentTicker<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last_percent: 0,
        }
    }

    /// Report the running byte count against the expected total.
    ///
    /// An unknown or zero total stays at 0% until the download finishes.
    pub fn update(&mut self, downloaded: u64, total: Option<u64>) {
        if downloaded == 0 {
            return;
        }
        let percent = match total {
            Some(total) if total > 0 => downloaded * 100 / total,
            _ => 0,
        };
        if percent != self.last_percent {
            self.last_percent = percent;
            self.sink.advance();
        }
    }

    /// Fill the indicator to completion.
    pub fn finish(&mut self) {
        self.sink.finish();
    }
}

/// Console progress bar with one tick per percentage point.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::new(100),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn advance(&mut self) {
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.set_position(100);
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CountingSink {
        advances: Rc<Cell<u32>>,
        finished: Rc<Cell<bool>>,
    }

    impl ProgressSink for CountingSink {
        fn advance(&mut self) {
            self.advances.set(self.advances.get() + 1);
        }

        fn finish(&mut self) {
            self.finished.set(true);
        }
    }

    #[test]
    fn one_advance_per_percent_change() {
        let sink = CountingSink::default();
        let mut ticker = PercentTicker::new(sink.clone());
        // 1000-byte download delivered in 10-byte chunks: each chunk crosses
        // exactly one percentage point.
        for downloaded in (10..=1000).step_by(10) {
            ticker.update(downloaded, Some(1000));
        }
        assert_eq!(sink.advances.get(), 100);
    }

    #[test]
    fn duplicate_percentages_do_not_advance() {
        let sink = CountingSink::default();
        let mut ticker = PercentTicker::new(sink.clone());
        ticker.update(500, Some(1000));
        ticker.update(505, Some(1000));
        ticker.update(509, Some(1000));
        assert_eq!(sink.advances.get(), 1);
        ticker.update(510, Some(1000));
        assert_eq!(sink.advances.get(), 2);
    }

    #[test]
    fn unknown_total_stays_at_zero() {
        let sink = CountingSink::default();
        let mut ticker = PercentTicker::new(sink.clone());
        ticker.update(4096, None);
        ticker.update(8192, Some(0));
        assert_eq!(sink.advances.get(), 0);
    }

    #[test]
    fn zero_bytes_never_tick() {
        let sink = CountingSink::default();
        let mut ticker = PercentTicker::new(sink.clone());
        ticker.update(0, Some(1000));
        assert_eq!(sink.advances.get(), 0);
    }

    #[test]
    fn finish_reaches_the_sink() {
        let sink = CountingSink::default();
        let mut ticker = PercentTicker::new(sink.clone());
        ticker.update(100, Some(200));
        ticker.finish();
        assert!(sink.finished.get());
    }
}
