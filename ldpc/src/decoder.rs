// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{BIG_INFINITY, CROSS_ERR, IndexMaps, LLR_LIMIT, MAX_ITER, Parameters};

fn clamp(x: f64) -> f64 {
    x.clamp(-LLR_LIMIT, LLR_LIMIT)
}

/// `f(x) = ln((e^x + 1) / (e^x - 1))`, saturated at both ends.
fn func_f(x: f64) -> f64 {
    if x >= BIG_INFINITY {
        1.0 / BIG_INFINITY
    } else if x <= 1.0 / BIG_INFINITY {
        BIG_INFINITY
    } else {
        ((x.exp() + 1.0) / (x.exp() - 1.0)).ln()
    }
}

/// Runs sum-product decoding of `hash_vector` for exactly [`MAX_ITER`]
/// rounds and hard-decides every bit from its posterior.
///
/// Messages are kept in dense `n x m` tables indexed `[variable][check]`.
/// Every intermediate log-likelihood is clamped to `[-LLR_LIMIT, LLR_LIMIT]`.
pub fn decode(params: &Parameters, hash_vector: &[u8], maps: &IndexMaps) -> Vec<u8> {
    let Parameters { n, m, wc, wr, .. } = *params;
    let at = |t: usize, row: usize| t * m + row;

    let prior = ((1.0 - CROSS_ERR) / CROSS_ERR).ln();
    let lr_f: Vec<f64> = hash_vector
        .iter()
        .map(|bit| prior * (f64::from(*bit) * 2.0 - 1.0))
        .collect();
    let mut lr_q = vec![0.0; n * m];
    let mut lr_r = vec![0.0; n * m];
    let mut lr_p = vec![0.0; n];

    for _ in 0..MAX_ITER {
        // variable to check
        for t in 0..n {
            let mut total = 0.0;
            for layer in 0..wc {
                total = clamp(total + lr_r[at(t, maps.row_in_col[layer][t])]);
            }
            for layer in 0..wc {
                let row = maps.row_in_col[layer][t];
                let extrinsic = clamp(total - lr_r[at(t, row)]);
                lr_q[at(t, row)] = clamp(lr_f[t] + extrinsic);
            }
        }

        // check to variable
        for row in 0..m {
            for l in 0..wr {
                let mut sum = 0.0;
                let mut sign = 1.0;
                for j in (0..wr).filter(|j| *j != l) {
                    let q = lr_q[at(maps.col_in_row[j][row], row)];
                    sum += func_f(q.abs());
                    sign *= if q > 0.0 { 1.0 } else { -1.0 };
                }
                lr_r[at(maps.col_in_row[l][row], row)] = clamp(sign * func_f(sum));
            }
        }

        // posterior
        for t in 0..n {
            lr_p[t] = clamp(lr_f[t]);
            for layer in 0..wc {
                lr_p[t] = clamp(lr_p[t] + clamp(lr_r[at(t, maps.row_in_col[layer][t])]));
            }
        }
    }

    lr_p.iter().map(|p| u8::from(*p >= 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParityCode, hash_vector, pack_codeword};

    fn code(n: usize, seed: i64) -> ParityCode {
        ParityCode::generate(Parameters {
            n,
            m: n * 3 / 4,
            wc: 3,
            wr: 4,
            seed,
            level: 0,
        })
    }

    #[test]
    fn test_func_f_saturates() {
        assert_eq!(func_f(0.0), BIG_INFINITY);
        assert_eq!(func_f(2e6), 1.0 / BIG_INFINITY);
        // f is its own inverse
        let x = 1.5;
        assert!((func_f(func_f(x)) - x).abs() < 1e-9);
    }

    #[test]
    fn test_decoder_is_deterministic() {
        let code = code(48, 99);
        let hv: Vec<u8> = (0..48).map(|i| ((i * 7 + 3) % 5 == 0) as u8).collect();
        let first = decode(&code.params, &hv, &code.maps);
        let second = decode(&code.params, &hv, &code.maps);
        assert_eq!(first, second);
        assert_eq!(first.len(), 48);
        assert!(first.iter().all(|bit| *bit <= 1));
    }

    #[test]
    fn test_decoder_golden_vectors() {
        let code = code(32, 1234);
        let decoded = decode(&code.params, &hash_vector(&[0x12, 0x34, 0x56, 0x78], 32), &code.maps);
        assert_eq!(pack_codeword(&decoded), vec![0x53, 0x31, 0x54, 0x7d]);

        // a single flipped bit is corrected back to the zero codeword
        let decoded = decode(&code.params, &hash_vector(&[0x80, 0, 0, 0], 32), &code.maps);
        assert_eq!(decoded, vec![0u8; 32]);
    }

    /// The all-zero word satisfies every check and strong priors keep it.
    #[test]
    fn test_zero_word_is_a_fixed_point() {
        let code = code(32, 11);
        let decoded = decode(&code.params, &[0u8; 32], &code.maps);
        assert_eq!(decoded, vec![0u8; 32]);
    }
}
