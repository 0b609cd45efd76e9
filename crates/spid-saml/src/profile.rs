//! SPID user profile.
//!
//! Maps the flat attribute statement of a SPID assertion onto typed fields.
//! The mapping is pure: nothing is validated beyond the attribute name, and
//! names SPID does not define are kept in [`SpidProfile::extra`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix SPID puts in front of Italian fiscal codes.
pub const FISCAL_CODE_PREFIX: &str = "TINIT-";

/// Prefix SPID puts in front of Italian VAT numbers.
pub const VAT_NUMBER_PREFIX: &str = "VATIT-";

/// Attribute names defined by the SPID technical rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpidAttribute {
    /// SPID identity code.
    SpidCode,
    /// First name.
    Name,
    /// Surname.
    FamilyName,
    /// Place of birth.
    PlaceOfBirth,
    /// Province of birth.
    CountyOfBirth,
    /// Date of birth.
    DateOfBirth,
    /// Gender.
    Gender,
    /// Company name.
    CompanyName,
    /// Company registered office.
    RegisteredOffice,
    /// Fiscal code, `TINIT-` prefixed.
    FiscalNumber,
    /// VAT number.
    IvaCode,
    /// Identity document.
    IdCard,
    /// Mobile phone number.
    MobilePhone,
    /// E-mail address.
    Email,
    /// Postal address.
    Address,
    /// Identity expiration date.
    ExpirationDate,
    /// Certified e-mail address (PEC).
    DigitalAddress,
}

impl SpidAttribute {
    /// Every SPID attribute.
    pub const ALL: [Self; 17] = [
        Self::SpidCode,
        Self::Name,
        Self::FamilyName,
        Self::PlaceOfBirth,
        Self::CountyOfBirth,
        Self::DateOfBirth,
        Self::Gender,
        Self::CompanyName,
        Self::RegisteredOffice,
        Self::FiscalNumber,
        Self::IvaCode,
        Self::IdCard,
        Self::MobilePhone,
        Self::Email,
        Self::Address,
        Self::ExpirationDate,
        Self::DigitalAddress,
    ];

    /// Returns the attribute `Name` used on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SpidCode => "spidCode",
            Self::Name => "name",
            Self::FamilyName => "familyName",
            Self::PlaceOfBirth => "placeOfBirth",
            Self::CountyOfBirth => "countyOfBirth",
            Self::DateOfBirth => "dateOfBirth",
            Self::Gender => "gender",
            Self::CompanyName => "companyName",
            Self::RegisteredOffice => "registeredOffice",
            Self::FiscalNumber => "fiscalNumber",
            Self::IvaCode => "ivaCode",
            Self::IdCard => "idCard",
            Self::MobilePhone => "mobilePhone",
            Self::Email => "email",
            Self::Address => "address",
            Self::ExpirationDate => "expirationDate",
            Self::DigitalAddress => "digitalAddress",
        }
    }

    /// Looks an attribute up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attribute| attribute.name() == name)
    }
}

impl fmt::Display for SpidAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A SPID user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpidProfile {
    /// SPID identity code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spid_code: Option<String>,
    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Surname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Place of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    /// Province of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county_of_birth: Option<String>,
    /// Date of birth, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    /// Gender, `M` or `F`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Company name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Company registered office.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_office: Option<String>,
    /// Fiscal code as sent, `TINIT-` prefixed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_number: Option<String>,
    /// VAT number as sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iva_code: Option<String>,
    /// Identity document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_card: Option<String>,
    /// Mobile phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    /// E-mail address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Postal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Identity expiration date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    /// Certified e-mail address (PEC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_address: Option<String>,
    /// Attributes SPID does not define.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl SpidProfile {
    /// Builds a profile from an assertion's attributes.
    #[must_use]
    pub fn from_attributes(attributes: &BTreeMap<String, String>) -> Self {
        let mut profile = Self::default();
        for (name, value) in attributes {
            match SpidAttribute::from_name(name) {
                Some(attribute) => *profile.slot(attribute) = Some(value.clone()),
                None => {
                    profile.extra.insert(name.clone(), value.clone());
                }
            }
        }
        profile
    }

    /// Returns the value of a SPID attribute.
    #[must_use]
    pub fn get(&self, attribute: SpidAttribute) -> Option<&str> {
        let value = match attribute {
            SpidAttribute::SpidCode => &self.spid_code,
            SpidAttribute::Name => &self.name,
            SpidAttribute::FamilyName => &self.family_name,
            SpidAttribute::PlaceOfBirth => &self.place_of_birth,
            SpidAttribute::CountyOfBirth => &self.county_of_birth,
            SpidAttribute::DateOfBirth => &self.date_of_birth,
            SpidAttribute::Gender => &self.gender,
            SpidAttribute::CompanyName => &self.company_name,
            SpidAttribute::RegisteredOffice => &self.registered_office,
            SpidAttribute::FiscalNumber => &self.fiscal_number,
            SpidAttribute::IvaCode => &self.iva_code,
            SpidAttribute::IdCard => &self.id_card,
            SpidAttribute::MobilePhone => &self.mobile_phone,
            SpidAttribute::Email => &self.email,
            SpidAttribute::Address => &self.address,
            SpidAttribute::ExpirationDate => &self.expiration_date,
            SpidAttribute::DigitalAddress => &self.digital_address,
        };
        value.as_deref()
    }

    /// Returns the fiscal code without the `TINIT-` prefix.
    #[must_use]
    pub fn fiscal_code(&self) -> Option<&str> {
        self.fiscal_number
            .as_deref()
            .map(|value| value.strip_prefix(FISCAL_CODE_PREFIX).unwrap_or(value))
    }

    /// Returns the VAT number without the `VATIT-` prefix.
    #[must_use]
    pub fn vat_number(&self) -> Option<&str> {
        self.iva_code
            .as_deref()
            .map(|value| value.strip_prefix(VAT_NUMBER_PREFIX).unwrap_or(value))
    }

    fn slot(&mut self, attribute: SpidAttribute) -> &mut Option<String> {
        match attribute {
            SpidAttribute::SpidCode => &mut self.spid_code,
            SpidAttribute::Name => &mut self.name,
            SpidAttribute::FamilyName => &mut self.family_name,
            SpidAttribute::PlaceOfBirth => &mut self.place_of_birth,
            SpidAttribute::CountyOfBirth => &mut self.county_of_birth,
            SpidAttribute::DateOfBirth => &mut self.date_of_birth,
            SpidAttribute::Gender => &mut self.gender,
            SpidAttribute::CompanyName => &mut self.company_name,
            SpidAttribute::RegisteredOffice => &mut self.registered_office,
            SpidAttribute::FiscalNumber => &mut self.fiscal_number,
            SpidAttribute::IvaCode => &mut self.iva_code,
            SpidAttribute::IdCard => &mut self.id_card,
            SpidAttribute::MobilePhone => &mut self.mobile_phone,
            SpidAttribute::Email => &mut self.email,
            SpidAttribute::Address => &mut self.address,
            SpidAttribute::ExpirationDate => &mut self.expiration_date,
            SpidAttribute::DigitalAddress => &mut self.digital_address,
        }
    }
}
