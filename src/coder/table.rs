//! The 47-state MQ probability estimation table (ITU-T T.800, Table C.2).

/// One state of the adaptive probability estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MqState {
    /// Quantized LPS probability (16-bit fixed-point).
    pub prob: u16,
    /// Next state after coding an MPS.
    pub trans_mps: u8,
    /// Next state after coding an LPS.
    pub trans_lps: u8,
    /// Whether an LPS in this state swaps the meaning of the MPS.
    pub switch: bool,
}

/// The standard MQ state table. Values are normative; the coder produces
/// conforming streams only with this exact table.
#[rustfmt::skip]
pub const MQ_STATES: [MqState; 47] = [
    /* 0*/ MqState { prob: 0x5601, trans_mps:  1, trans_lps:  1, switch: true  },
    /* 1*/ MqState { prob: 0x3401, trans_mps:  2, trans_lps:  6, switch: false },
    /* 2*/ MqState { prob: 0x1801, trans_mps:  3, trans_lps:  9, switch: false },
    /* 3*/ MqState { prob: 0x0AC1, trans_mps:  4, trans_lps: 12, switch: false },
    /* 4*/ MqState { prob: 0x0521, trans_mps:  5, trans_lps: 29, switch: false },
    /* 5*/ MqState { prob: 0x0221, trans_mps: 38, trans_lps: 33, switch: false },
    /* 6*/ MqState { prob: 0x5601, trans_mps:  7, trans_lps:  6, switch: true  },
    /* 7*/ MqState { prob: 0x5401, trans_mps:  8, trans_lps: 14, switch: false },
    /* 8*/ MqState { prob: 0x4801, trans_mps:  9, trans_lps: 14, switch: false },
    /* 9*/ MqState { prob: 0x3801, trans_mps: 10, trans_lps: 14, switch: false },
    /*10*/ MqState { prob: 0x3001, trans_mps: 11, trans_lps: 17, switch: false },
    /*11*/ MqState { prob: 0x2401, trans_mps: 12, trans_lps: 18, switch: false },
    /*12*/ MqState { prob: 0x1C01, trans_mps: 13, trans_lps: 20, switch: false },
    /*13*/ MqState { prob: 0x1601, trans_mps: 29, trans_lps: 21, switch: false },
    /*14*/ MqState { prob: 0x5601, trans_mps: 15, trans_lps: 14, switch: true  },
    /*15*/ MqState { prob: 0x5401, trans_mps: 16, trans_lps: 14, switch: false },
    /*16*/ MqState { prob: 0x5101, trans_mps: 17, trans_lps: 15, switch: false },
    /*17*/ MqState { prob: 0x4801, trans_mps: 18, trans_lps: 16, switch: false },
    /*18*/ MqState { prob: 0x3801, trans_mps: 19, trans_lps: 17, switch: false },
    /*19*/ MqState { prob: 0x3401, trans_mps: 20, trans_lps: 18, switch: false },
    /*20*/ MqState { prob: 0x3001, trans_mps: 21, trans_lps: 19, switch: false },
    /*21*/ MqState { prob: 0x2801, trans_mps: 22, trans_lps: 19, switch: false },
    /*22*/ MqState { prob: 0x2401, trans_mps: 23, trans_lps: 20, switch: false },
    /*23*/ MqState { prob: 0x2201, trans_mps: 24, trans_lps: 21, switch: false },
    /*24*/ MqState { prob: 0x1C01, trans_mps: 25, trans_lps: 22, switch: false },
    /*25*/ MqState { prob: 0x1801, trans_mps: 26, trans_lps: 23, switch: false },
    /*26*/ MqState { prob: 0x1601, trans_mps: 27, trans_lps: 24, switch: false },
    /*27*/ MqState { prob: 0x1401, trans_mps: 28, trans_lps: 25, switch: false },
    /*28*/ MqState { prob: 0x1201, trans_mps: 29, trans_lps: 26, switch: false },
    /*29*/ MqState { prob: 0x1101, trans_mps: 30, trans_lps: 27, switch: false },
    /*30*/ MqState { prob: 0x0AC1, trans_mps: 31, trans_lps: 28, switch: false },
    /*31*/ MqState { prob: 0x09C1, trans_mps: 32, trans_lps: 29, switch: false },
    /*32*/ MqState { prob: 0x08A1, trans_mps: 33, trans_lps: 30, switch: false },
    /*33*/ MqState { prob: 0x0521, trans_mps: 34, trans_lps: 31, switch: false },
    /*34*/ MqState { prob: 0x0441, trans_mps: 35, trans_lps: 32, switch: false },
    /*35*/ MqState { prob: 0x02A1, trans_mps: 36, trans_lps: 33, switch: false },
    /*36*/ MqState { prob: 0x0221, trans_mps: 37, trans_lps: 34, switch: false },
    /*37*/ MqState { prob: 0x0141, trans_mps: 38, trans_lps: 35, switch: false },
    /*38*/ MqState { prob: 0x0111, trans_mps: 39, trans_lps: 36, switch: false },
    /*39*/ MqState { prob: 0x0085, trans_mps: 40, trans_lps: 37, switch: false },
    /*40*/ MqState { prob: 0x0049, trans_mps: 41, trans_lps: 38, switch: false },
    /*41*/ MqState { prob: 0x0025, trans_mps: 42, trans_lps: 39, switch: false },
    /*42*/ MqState { prob: 0x0015, trans_mps: 43, trans_lps: 40, switch: false },
    /*43*/ MqState { prob: 0x0009, trans_mps: 44, trans_lps: 41, switch: false },
    /*44*/ MqState { prob: 0x0005, trans_mps: 45, trans_lps: 42, switch: false },
    /*45*/ MqState { prob: 0x0001, trans_mps: 45, trans_lps: 43, switch: false },
    /*46*/ MqState { prob: 0x5601, trans_mps: 46, trans_lps: 46, switch: false },
];
