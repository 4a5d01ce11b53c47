use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::TrainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskLabel {
    Wear = 0,
    Incorrect = 1,
    NotWear = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenderLabel {
    Male = 0,
    Female = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeLabel {
    Young = 0,
    Middle = 1,
    Old = 2,
}

impl MaskLabel {
    /// Maps an image file stem (`mask1`..`mask5`, `incorrect_mask`, `normal`).
    pub fn from_file_stem(stem: &str) -> Option<MaskLabel> {
        match stem {
            "mask1" | "mask2" | "mask3" | "mask4" | "mask5" => Some(MaskLabel::Wear),
            "incorrect_mask" => Some(MaskLabel::Incorrect),
            "normal" => Some(MaskLabel::NotWear),
            _ => None,
        }
    }

    fn from_index(i: usize) -> MaskLabel {
        match i {
            0 => MaskLabel::Wear,
            1 => MaskLabel::Incorrect,
            _ => MaskLabel::NotWear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaskLabel::Wear      => "wear",
            MaskLabel::Incorrect => "incorrect",
            MaskLabel::NotWear   => "not wear",
        }
    }
}

impl GenderLabel {
    pub fn parse(s: &str) -> Option<GenderLabel> {
        match s {
            "male" => Some(GenderLabel::Male),
            "female" => Some(GenderLabel::Female),
            _ => None,
        }
    }

    fn from_index(i: usize) -> GenderLabel {
        if i == 0 { GenderLabel::Male } else { GenderLabel::Female }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenderLabel::Male   => "male",
            GenderLabel::Female => "female",
        }
    }
}

impl AgeLabel {
    pub fn from_years(age: u32) -> AgeLabel {
        if age < 30 {
            AgeLabel::Young
        } else if age < 60 {
            AgeLabel::Middle
        } else {
            AgeLabel::Old
        }
    }

    fn from_index(i: usize) -> AgeLabel {
        match i {
            0 => AgeLabel::Young,
            1 => AgeLabel::Middle,
            _ => AgeLabel::Old,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeLabel::Young  => "<30",
            AgeLabel::Middle => "30-59",
            AgeLabel::Old    => ">=60",
        }
    }
}

/// Mask, gender and age of one image; packs into the 18-way class id
/// `mask * 6 + gender * 3 + age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiLabel {
    pub mask: MaskLabel,
    pub gender: GenderLabel,
    pub age: AgeLabel,
}

impl MultiLabel {
    pub fn encode(&self) -> usize {
        self.mask as usize * 6 + self.gender as usize * 3 + self.age as usize
    }

    pub fn decode(class: usize) -> MultiLabel {
        MultiLabel {
            mask: MaskLabel::from_index((class / 6) % 3),
            gender: GenderLabel::from_index((class / 3) % 2),
            age: AgeLabel::from_index(class % 3),
        }
    }
}

/// Which label the classifier predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelTarget {
    Total,
    Mask,
    Gender,
    Age,
}

impl LabelTarget {
    pub fn num_classes(&self) -> usize {
        match self {
            LabelTarget::Total  => 18,
            LabelTarget::Mask   => 3,
            LabelTarget::Gender => 2,
            LabelTarget::Age    => 3,
        }
    }

    pub fn class_of(&self, label: &MultiLabel) -> usize {
        match self {
            LabelTarget::Total  => label.encode(),
            LabelTarget::Mask   => label.mask as usize,
            LabelTarget::Gender => label.gender as usize,
            LabelTarget::Age    => label.age as usize,
        }
    }

    /// `(task, label)` pairs a class id stands for, e.g. for figure captions.
    pub fn describe(&self, class: usize) -> Vec<(&'static str, &'static str)> {
        match self {
            LabelTarget::Total => {
                let l = MultiLabel::decode(class);
                vec![("mask", l.mask.as_str()), ("gender", l.gender.as_str()), ("age", l.age.as_str())]
            }
            LabelTarget::Mask   => vec![("mask", MaskLabel::from_index(class).as_str())],
            LabelTarget::Gender => vec![("gender", GenderLabel::from_index(class).as_str())],
            LabelTarget::Age    => vec![("age", AgeLabel::from_index(class).as_str())],
        }
    }
}

impl FromStr for LabelTarget {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total" => Ok(LabelTarget::Total),
            "mask" => Ok(LabelTarget::Mask),
            "gender" => Ok(LabelTarget::Gender),
            "age" => Ok(LabelTarget::Age),
            other => Err(TrainError::Config(format!("unknown label target {other:?} (total, mask, gender, age)"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_covers_all_classes() {
        for class in 0..18 {
            assert_eq!(MultiLabel::decode(class).encode(), class);
        }
        let l = MultiLabel { mask: MaskLabel::Incorrect, gender: GenderLabel::Female, age: AgeLabel::Old };
        assert_eq!(l.encode(), 11);
    }

    #[test]
    fn age_buckets() {
        assert_eq!(AgeLabel::from_years(29), AgeLabel::Young);
        assert_eq!(AgeLabel::from_years(30), AgeLabel::Middle);
        assert_eq!(AgeLabel::from_years(60), AgeLabel::Old);
    }

    #[test]
    fn describe_total_class() {
        let parts = LabelTarget::Total.describe(11);
        assert_eq!(parts, vec![("mask", "incorrect"), ("gender", "female"), ("age", ">=60")]);
    }
}
