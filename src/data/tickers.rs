//! Static list of tracked tickers
//!
//! Every per-ticker route is checked against this list before any cache or
//! upstream access.

/// All tracked Euronext Paris tickers, in display order
///
/// Batch results (quotes, sparklines) follow this order.
pub static TICKERS: [&str; 120] = [
    "OR.PA", "SU.PA", "EL.PA", "SAN.PA", "AI.PA", "LR.PA", "DSY.PA",
    "CAP.PA", "STMPA.PA", "DIM.PA", "BVI.PA", "BIM.PA", "IPN.PA",
    "GTT.PA", "TRI.PA", "VIRP.PA", "EXENS.PA", "ATE.PA", "VU.PA",
    "BB.PA", "ITP.PA", "RBT.PA", "ESKR.PA", "IPS.PA", "PLNW.PA",
    "MAU.PA", "VETO.PA", "NRO.PA", "SOI.PA", "LSS.PA", "AUB.PA",
    "MLPLC.PA", "THEP.PA", "ASY.PA", "EQS.PA", "BOL.PA", "ALGIL.PA",
    "ALSEM.PA", "ALSTI.PA", "PERR.PA", "MLVSY.PA", "ALERS.PA",
    "PARRO.PA", "ALBFR.PA", "ALSTW.PA", "EAPI.PA", "ALLIX.PA",
    "ALTPC.PA", "ALVU.PA", "ALPM.PA", "MAAT.PA", "ALNSE.PA",
    "ABNX.PA", "MLCHE.PA", "ALESE.PA", "ADOC.PA", "ALVAZ.PA",
    "MLSCI.PA", "ALCJ.PA", "COH.PA", "DPAM.PA", "ALHGR.PA",
    "ALBKK.PA", "ALMEX.PA", "ALODC.PA", "ALBLD.PA", "ALMDG.PA",
    "SACI.PA", "ABLD.PA", "PAR.PA", "ALTRO.PA", "MLMAQ.PA",
    "ALDRV.PA", "ALITL.PA", "MEMS.PA", "ALHRS.PA", "ALGEN.PA",
    "ALBPK.PA", "ALTTI.PA", "ALHIT.PA", "ALCOG.PA", "MLORQ.PA",
    "MLMCA.PA", "SIGHT.PA", "ALMCE.PA", "ALCWE.PA", "FIPP.PA",
    "ALINS.PA", "ALMGI.PA", "ALBDM.PA", "ALSGD.PA", "ALBLU.PA",
    "MLSDN.PA", "MLLAB.PA", "MLEDR.PA", "MLFXO.PA", "PROAC.PA",
    "MLONL.PA", "ALAST.PA", "ALWIT.PA", "ALNLF.PA", "ALENT.PA",
    "ALVIA.PA", "ALOKW.PA", "ALKLA.PA", "MLBON.PA", "ALRPD.PA",
    "MLDAM.PA", "RAL.PA", "ALLPL.PA", "MLAAT.PA", "ALVET.PA",
    "MLPVG.PA", "MLPET.PA", "MLISP.PA", "MLIPO.PA", "MLJDL.PA",
    "MLARO.PA", "MLWIZ.PA", "MLRAC.PA",
];

/// Returns the full list of tracked tickers
pub fn all_tickers() -> &'static [&'static str] {
    &TICKERS
}

/// Looks up a ticker in `tickers`, ignoring case
///
/// # Returns
/// * `Some(&'static str)` - The canonical (upper-case) ticker
/// * `None` - If the ticker is not tracked
pub fn find_ticker(tickers: &[&'static str], input: &str) -> Option<&'static str> {
    let wanted = input.to_uppercase();
    tickers.iter().copied().find(|ticker| *ticker == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tickers_returns_every_ticker() {
        assert_eq!(all_tickers().len(), 120);
        assert_eq!(all_tickers()[0], "OR.PA");
        assert_eq!(all_tickers()[119], "MLRAC.PA");
    }

    #[test]
    fn test_all_tickers_have_unique_ids() {
        let mut ids: Vec<&str> = all_tickers().to_vec();
        ids.sort();
        let original_len = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), original_len, "Tickers are not unique");
    }

    #[test]
    fn test_all_tickers_are_paris_listings() {
        for ticker in all_tickers() {
            assert!(ticker.ends_with(".PA"), "Ticker {} is not a Paris listing", ticker);
            assert_eq!(*ticker, ticker.to_uppercase(), "Ticker {} is not upper case", ticker);
        }
    }

    #[test]
    fn test_find_ticker_is_case_insensitive() {
        assert_eq!(find_ticker(all_tickers(), "OR.PA"), Some("OR.PA"));
        assert_eq!(find_ticker(all_tickers(), "or.pa"), Some("OR.PA"));
        assert_eq!(find_ticker(all_tickers(), "Mlrac.Pa"), Some("MLRAC.PA"));
    }

    #[test]
    fn test_find_ticker_returns_none_for_unknown() {
        assert!(find_ticker(all_tickers(), "AAPL").is_none());
        assert!(find_ticker(all_tickers(), "OR").is_none());
        assert!(find_ticker(all_tickers(), "").is_none());
    }
}
