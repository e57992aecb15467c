use analysis_core::{FinalSignal, TechnicalVerdict};

pub fn final_signal(signal: FinalSignal, abbreviate: bool) -> &'static str {
    if !abbreviate {
        return signal.to_label();
    }
    match signal {
        FinalSignal::Buy => "BY",
        FinalSignal::Sell => "SL",
        FinalSignal::Hold => "HOLD",
    }
}

pub fn technical_verdict(verdict: TechnicalVerdict, abbreviate: bool) -> &'static str {
    if !abbreviate {
        return verdict.to_label();
    }
    match verdict {
        TechnicalVerdict::Buy => "BY",
        TechnicalVerdict::Sell => "SL",
        TechnicalVerdict::Neutral => "-",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(final_signal(FinalSignal::Buy, false), "Buy");
        assert_eq!(final_signal(FinalSignal::Buy, true), "BY");
        assert_eq!(final_signal(FinalSignal::Sell, true), "SL");
        assert_eq!(final_signal(FinalSignal::Hold, true), "HOLD");
        assert_eq!(technical_verdict(TechnicalVerdict::Neutral, false), "Neutral");
        assert_eq!(technical_verdict(TechnicalVerdict::Neutral, true), "-");
        assert_eq!(technical_verdict(TechnicalVerdict::Sell, true), "SL");
    }
}
