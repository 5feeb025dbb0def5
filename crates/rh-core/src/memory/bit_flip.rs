use serde::{Deserialize, Serialize};

/// Direction of a bit transition observed in a [`BitFlip`].
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum FlipDirection {
    /// Bit flipped from 0 to 1.
    ZeroToOne,
    /// Bit flipped from 1 to 0.
    OneToZero,
    /// More than one bit flipped, in (potentially) different directions.
    Multiple(Vec<FlipDirection>),
    /// No bit flip occurred.
    None,
}

/// A bit flip observed while scanning the victim memory region.
///
/// One `BitFlip` is recorded per differing byte. `bit_index` names the
/// lowest-order bit position that differs; `bitmask` records every bit that
/// differs within the byte, since Rowhammer flips occasionally corrupt more
/// than one bit of a byte at a time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BitFlip {
    /// Virtual address of the flipped byte.
    pub address: usize,
    /// Offset of the flipped byte within its page.
    pub page_offset: usize,
    /// DRAM row the flipped byte belongs to.
    pub row: usize,
    /// Lowest-order bit position that differs between expected and actual.
    pub bit_index: u8,
    /// Bitmask of every bit that differs (1 = bit flipped).
    pub bitmask: u8,
    /// The expected (written) byte value.
    pub expected_byte: u8,
    /// The actual byte value observed during the scan.
    pub actual_byte: u8,
    /// RFC 3339 timestamp of when the flip was observed.
    pub observed_at: String,
}

impl BitFlip {
    /// Builds a `BitFlip` from an address/row and the expected/actual byte values.
    pub fn new(address: usize, row: usize, expected_byte: u8, actual_byte: u8) -> Self {
        let bitmask = expected_byte ^ actual_byte;
        BitFlip {
            address,
            page_offset: address & crate::util::PAGE_MASK,
            row,
            bit_index: bitmask.trailing_zeros() as u8,
            bitmask,
            expected_byte,
            actual_byte,
            observed_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// Classifies the direction(s) of the observed transition(s).
    pub fn flip_direction(&self) -> FlipDirection {
        match self.bitmask.count_ones() {
            0 => FlipDirection::None,
            1 => {
                if self.bitmask & self.expected_byte == 0 {
                    FlipDirection::ZeroToOne
                } else {
                    FlipDirection::OneToZero
                }
            }
            _ => FlipDirection::Multiple(
                (0..8)
                    .filter_map(|i| {
                        if self.bitmask & (1 << i) != 0 {
                            Some(if self.expected_byte & (1 << i) != 0 {
                                FlipDirection::OneToZero
                            } else {
                                FlipDirection::ZeroToOne
                            })
                        } else {
                            None
                        }
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_direction() {
        let flip = BitFlip::new(0, 0, 0b0000_0001, 0b0000_0000);
        assert_eq!(flip.flip_direction(), FlipDirection::OneToZero);

        let flip = BitFlip::new(0, 0, 0b0000_0000, 0b0000_0001);
        assert_eq!(flip.flip_direction(), FlipDirection::ZeroToOne);
    }

    #[test]
    fn multi_bit_direction() {
        let flip = BitFlip::new(0, 0, 0b0000_0010, 0b0000_0001);
        assert_eq!(
            flip.flip_direction(),
            FlipDirection::Multiple(vec![FlipDirection::ZeroToOne, FlipDirection::OneToZero])
        );
    }

    #[test]
    fn bit_index_is_lowest_set_bit() {
        let flip = BitFlip::new(0, 0, 0b0000_1100, 0b0000_0000);
        assert_eq!(flip.bit_index, 2);
    }
}
